mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use branchstock_api::services::reports::{MovementReportQuery, TransferReportQuery};
use branchstock_api::services::transfers::{CreateTransferInput, TransferItemInput};

use common::*;

async fn run_transfer(app: &TestApp, quantity: Decimal) -> i64 {
    let created = app
        .state
        .services
        .transfers
        .create(
            &app.ctx(MANAGER_A),
            CreateTransferInput {
                from_branch_id: MAIN_BRANCH,
                to_branch_id: OUTLET_BRANCH,
                items: vec![TransferItemInput {
                    product_id: FLOUR,
                    quantity,
                }],
                notes: None,
                scheduled_date: None,
                ship_on_create: false,
                transfer_type: None,
            },
        )
        .await
        .expect("create");
    app.state
        .services
        .transfers
        .ship(&app.ctx(MANAGER_A), created.transfer.id)
        .await
        .expect("ship");
    app.state
        .services
        .transfers
        .receive(&app.ctx(MANAGER_B), created.transfer.id, vec![])
        .await
        .expect("receive");
    created.transfer.id
}

#[tokio::test]
async fn movement_history_totals_balance() {
    let app = TestApp::new().await;
    app.seed_stock(MAIN_BRANCH, FLOUR, dec!(100)).await;
    run_transfer(&app, dec!(40)).await;

    let report = app
        .state
        .services
        .reports
        .movement_history(
            &app.ctx(MANAGER_A),
            MovementReportQuery {
                branch_id: None,
                product_id: Some(FLOUR),
                from_date: None,
                to_date: None,
            },
        )
        .await
        .expect("report");

    // Opening 100 in, 40 out of main, 40 into outlet.
    assert_eq!(report.totals.total_in, dec!(140));
    assert_eq!(report.totals.total_out, dec!(40));
    assert_eq!(report.totals.net_change, dec!(100));
    // Flour standard cost is 25.0.
    assert_eq!(report.totals.value_out, dec!(40) * dec!(25.0));
    assert_eq!(report.movements.len(), 3);
}

#[tokio::test]
async fn transfer_stats_group_by_status_and_type() {
    let app = TestApp::new().await;
    app.seed_stock(MAIN_BRANCH, FLOUR, dec!(100)).await;
    run_transfer(&app, dec!(10)).await;

    let pending = app
        .state
        .services
        .transfers
        .create(
            &app.ctx(MANAGER_A),
            CreateTransferInput {
                from_branch_id: MAIN_BRANCH,
                to_branch_id: OUTLET_BRANCH,
                items: vec![TransferItemInput {
                    product_id: FLOUR,
                    quantity: dec!(5),
                }],
                notes: None,
                scheduled_date: None,
                ship_on_create: false,
                transfer_type: None,
            },
        )
        .await
        .expect("create");
    app.state
        .services
        .transfers
        .cancel(&app.ctx(MANAGER_A), pending.transfer.id, "changed plans")
        .await
        .expect("cancel");

    let stats = app
        .state
        .services
        .reports
        .transfer_stats(
            &app.ctx(MANAGER_A),
            TransferReportQuery {
                from_date: None,
                to_date: None,
            },
        )
        .await
        .expect("stats");

    assert_eq!(stats.total_transfers, 2);
    assert_eq!(stats.by_status.get("received"), Some(&1));
    assert_eq!(stats.by_status.get("cancelled"), Some(&1));
    assert_eq!(stats.by_type.get("inter_branch_transfer"), Some(&2));
    assert_eq!(stats.average_items_per_transfer, dec!(1));
}

#[tokio::test]
async fn low_stock_flags_products_at_or_below_threshold() {
    let app = TestApp::new().await;
    app.seed_stock(MAIN_BRANCH, FLOUR, dec!(3)).await;
    app.seed_stock(MAIN_BRANCH, SUGAR, dec!(50)).await;
    app.set_reorder_level(MAIN_BRANCH, FLOUR, dec!(5)).await;
    app.set_reorder_level(MAIN_BRANCH, SUGAR, dec!(5)).await;
    // Threshold with no stock at all: out of stock.
    app.set_reorder_level(OUTLET_BRANCH, FLOUR, dec!(2)).await;

    let rows = app
        .state
        .services
        .reports
        .low_stock(&app.ctx(MANAGER_A), None)
        .await
        .expect("report");

    assert_eq!(rows.len(), 2);
    let flour_main = rows
        .iter()
        .find(|r| r.branch_id == MAIN_BRANCH && r.product_id == FLOUR)
        .expect("main flour row");
    assert_eq!(flour_main.current_stock, dec!(3));
    assert!(!flour_main.out_of_stock);

    let flour_outlet = rows
        .iter()
        .find(|r| r.branch_id == OUTLET_BRANCH)
        .expect("outlet flour row");
    assert!(flour_outlet.out_of_stock);
}

#[tokio::test]
async fn branch_throughput_splits_in_and_out() {
    let app = TestApp::new().await;
    app.seed_stock(MAIN_BRANCH, FLOUR, dec!(100)).await;
    run_transfer(&app, dec!(25)).await;

    let rows = app
        .state
        .services
        .reports
        .branch_throughput(
            &app.ctx(MANAGER_A),
            MovementReportQuery {
                branch_id: None,
                product_id: None,
                from_date: None,
                to_date: None,
            },
        )
        .await
        .expect("report");

    let main = rows
        .iter()
        .find(|r| r.branch_id == MAIN_BRANCH)
        .expect("main row");
    assert_eq!(main.quantity_in, dec!(100));
    assert_eq!(main.quantity_out, dec!(25));
    assert_eq!(main.movement_count, 2);

    let outlet = rows
        .iter()
        .find(|r| r.branch_id == OUTLET_BRANCH)
        .expect("outlet row");
    assert_eq!(outlet.quantity_in, dec!(25));
    assert_eq!(outlet.quantity_out, Decimal::ZERO);
}
