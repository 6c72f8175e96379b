use chrono::{Duration, Utc};
use deal_core::{DealView, NewDeal};
use deal_tests::TestCtx;
use eyre::Result;

/// Creates a deal with `items` slots ending `ends_in` from the wall clock and
/// checks that it starts unclaimed.
#[allow(unused)]
pub async fn open_deal(ctx: &TestCtx, items: i64, ends_in: Duration) -> Result<DealView> {
    let new = NewDeal {
        item_count: items,
        price: 19.99,
        end_time: Utc::now() + ends_in,
    };
    let response = ctx.api.create_deal(&new).await?;
    assert_eq!(response.status, 201, "Creating a deal must answer 201.");
    let deal = response.result?;
    assert_eq!(deal.claimed_count, 0, "A new deal must not have any claims.");
    assert_eq!(deal.item_count, items);
    Ok(deal)
}
