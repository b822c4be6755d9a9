//! Database entities for the branch stock platform.
//!
//! All quantity and cost columns are `Decimal(16, 4)`, the widest precision
//! every supported backend accepts. Status and type
//! columns are stored as snake_case strings; the matching Rust enums live
//! next to the entity that owns them.

pub mod branch;
pub mod permission_rule;
pub mod product;
pub mod reorder_level;
pub mod sequence_counter;
pub mod stock_level;
pub mod stock_movement;
pub mod tenant_setting;
pub mod transfer;
pub mod transfer_item;
pub mod user_branch;

pub use branch::Entity as Branch;
pub use permission_rule::Entity as PermissionRule;
pub use product::Entity as Product;
pub use reorder_level::Entity as ReorderLevel;
pub use sequence_counter::Entity as SequenceCounter;
pub use stock_level::Entity as StockLevel;
pub use stock_movement::Entity as StockMovement;
pub use tenant_setting::Entity as TenantSetting;
pub use transfer::Entity as Transfer;
pub use transfer_item::Entity as TransferItem;
pub use user_branch::Entity as UserBranch;
