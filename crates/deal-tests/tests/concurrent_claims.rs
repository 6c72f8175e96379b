use std::collections::HashSet;

use chrono::Duration;
use deal_tests::TestCtxBuilder;
use eyre::Result;
use futures::future::join_all;
use util::open_deal;

mod util;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn test_racing_claims_never_oversell() -> Result<()> {
    const USERS: usize = 200;
    const SLOTS: i64 = 37;

    let ctx = TestCtxBuilder::from_env()?
        .with_handler_threads(8)
        .build()
        .await?;
    let deal = open_deal(&ctx, SLOTS, Duration::hours(1)).await?;

    let claims = (0..USERS).map(|user| {
        let api = ctx.api.clone();
        let id = deal.id.clone();
        tokio::spawn(async move {
            let user = format!("user-{user}");
            let response = api.claim_deal(&id, Some(user.as_str())).await?;
            eyre::Ok((user, response))
        })
    });

    let mut winners = HashSet::new();
    let mut sold_out = 0;
    for joined in join_all(claims).await {
        let (user, response) = joined??;
        match response.result {
            Ok(deal) => {
                assert!(deal.claimed_count as i64 <= SLOTS);
                winners.insert(user);
            }
            Err(e) => {
                assert_eq!(e.msg, "Deal is sold out");
                sold_out += 1;
            }
        }
    }

    assert_eq!(winners.len(), SLOTS as usize, "Exactly one claim per slot must win.");
    assert_eq!(sold_out, USERS - SLOTS as usize);
    let final_state = ctx.api.get_deal(&deal.id).await?.result?;
    assert_eq!(final_state.claimed_count, SLOTS as usize);

    ctx.finish().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn test_same_user_racing_wins_once() -> Result<()> {
    let ctx = TestCtxBuilder::from_env()?
        .with_handler_threads(8)
        .build()
        .await?;
    let deal = open_deal(&ctx, 100, Duration::hours(1)).await?;

    let claims = (0..50).map(|_| {
        let api = ctx.api.clone();
        let id = deal.id.clone();
        tokio::spawn(async move { api.claim_deal(&id, Some("twin")).await })
    });

    let mut won = 0;
    for joined in join_all(claims).await {
        let response = joined??;
        match response.result {
            Ok(_) => won += 1,
            Err(e) => assert_eq!(e.msg, "User already claimed the deal"),
        }
    }
    assert_eq!(won, 1);

    ctx.finish().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn test_parallel_creates_get_distinct_ids() -> Result<()> {
    let ctx = TestCtxBuilder::from_env()?
        .with_handler_threads(8)
        .build()
        .await?;

    let creates = (0..100).map(|_| {
        let api = ctx.api.clone();
        tokio::spawn(async move {
            let new = deal_core::NewDeal {
                item_count: 1,
                price: 1.0,
                end_time: chrono::Utc::now() + Duration::hours(1),
            };
            api.create_deal(&new).await
        })
    });

    let mut ids = HashSet::new();
    for joined in join_all(creates).await {
        ids.insert(joined??.result?.id);
    }
    assert_eq!(ids.len(), 100);
    assert_eq!(ctx.api.list_deals().await?.result?.len(), 100);

    ctx.finish().await;
    Ok(())
}
