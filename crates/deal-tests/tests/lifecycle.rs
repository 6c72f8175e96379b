use chrono::{Duration, TimeZone, Utc};
use deal_core::{DealUpdate, IdScheme, NewDeal};
use deal_tests::TestCtxBuilder;
use eyre::Result;
use util::open_deal;

mod util;

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_repeated_claim_is_rejected() -> Result<()> {
    let ctx = TestCtxBuilder::from_env()?.build().await?;
    let deal = open_deal(&ctx, 5, Duration::hours(1)).await?;
    let session = ctx.api.create_user_session();

    assert!(session.claim(&deal.id).await?.result.is_ok());
    let again = session.claim(&deal.id).await?;
    assert_eq!(again.status, 410);
    assert_eq!(again.err_msg(), Some("User already claimed the deal"));

    let current = ctx.api.get_deal(&deal.id).await?.result?;
    assert_eq!(current.claimed_count, 1, "A rejected claim must not count.");

    drop(session);
    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_update_replaces_terms_but_keeps_claims() -> Result<()> {
    let ctx = TestCtxBuilder::from_env()?.build().await?;
    let deal = open_deal(&ctx, 3, Duration::hours(1)).await?;
    for user in ["a", "b"] {
        ctx.api.claim_deal(&deal.id, Some(user)).await?.result?;
    }

    let update = DealUpdate {
        item_count: 1,
        end_time: deal.end_time + Duration::days(1),
    };
    let updated = ctx.api.update_deal(&deal.id, &update).await?;
    assert_eq!(updated.status, 200);
    let updated = updated.result?;
    assert_eq!(updated.id, deal.id);
    assert_eq!(updated.item_count, 1);
    assert_eq!(updated.end_time, update.end_time);
    assert_eq!(updated.price, deal.price);
    assert_eq!(updated.claimed_count, 2);

    let blocked = ctx.api.claim_deal(&deal.id, Some("c")).await?;
    assert_eq!(blocked.err_msg(), Some("Deal is sold out"));

    // The previous claimants are still remembered.
    let reopen = DealUpdate {
        item_count: 10,
        end_time: update.end_time,
    };
    ctx.api.update_deal(&deal.id, &reopen).await?.result?;
    let repeat = ctx.api.claim_deal(&deal.id, Some("a")).await?;
    assert_eq!(repeat.err_msg(), Some("User already claimed the deal"));

    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_expiry_follows_the_clock() -> Result<()> {
    let start = Utc.with_ymd_and_hms(2031, 3, 14, 9, 0, 0).unwrap();
    let ctx = TestCtxBuilder::from_env()?
        .with_manual_clock(start)
        .build()
        .await?;

    let new = NewDeal {
        item_count: 1,
        price: 3.5,
        end_time: start + Duration::hours(1),
    };
    let deal = ctx.api.create_deal(&new).await?.result?;
    ctx.api.claim_deal(&deal.id, Some("early")).await?.result?;

    ctx.clock()?.advance(Duration::hours(2));
    let late = ctx.api.claim_deal(&deal.id, Some("late")).await?;
    assert_eq!(
        late.err_msg(),
        Some("Deal ended"),
        "An expired deal that is also sold out must report that it ended."
    );

    // Still visible and updatable after expiry.
    assert!(ctx.api.get_deal(&deal.id).await?.result.is_ok());
    let extend = DealUpdate {
        item_count: 2,
        end_time: start + Duration::hours(3),
    };
    ctx.api.update_deal(&deal.id, &extend).await?.result?;
    let claimed = ctx.api.claim_deal(&deal.id, Some("late")).await?.result?;
    assert_eq!(claimed.claimed_count, 2);

    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_end_removes_visibility() -> Result<()> {
    let ctx = TestCtxBuilder::from_env()?
        .with_id_scheme(IdScheme::Sequential)
        .build()
        .await?;
    let keep = open_deal(&ctx, 1, Duration::hours(1)).await?;
    let gone = open_deal(&ctx, 1, Duration::hours(1)).await?;
    assert_eq!(keep.id, "deal-1");
    assert_eq!(gone.id, "deal-2");

    assert_eq!(ctx.api.end_deal(&gone.id).await?.result?, gone);

    let update = DealUpdate {
        item_count: 1,
        end_time: gone.end_time,
    };
    assert_eq!(ctx.api.update_deal(&gone.id, &update).await?.status, 404);
    assert_eq!(ctx.api.claim_deal(&gone.id, Some("x")).await?.status, 404);
    assert_eq!(ctx.api.end_deal(&gone.id).await?.status, 404);
    assert_eq!(ctx.api.get_deal(&gone.id).await?.status, 404);

    let live = ctx.api.list_deals().await?.result?;
    assert_eq!(live, vec![keep]);

    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_malformed_requests_do_not_reach_the_registry() -> Result<()> {
    let ctx = TestCtxBuilder::from_env()?.build().await?;

    let broken = ctx.api.create_deal_raw(r#"{"item": "many"}"#).await?;
    assert_eq!(broken.status, 400);
    assert!(ctx.api.list_deals().await?.result?.is_empty());

    let deal = open_deal(&ctx, 2, Duration::hours(1)).await?;
    let broken = ctx.api.update_deal_raw(&deal.id, "not json").await?;
    assert_eq!(broken.status, 400);
    assert_eq!(ctx.api.get_deal(&deal.id).await?.result?, deal);

    let anonymous = ctx.api.claim_deal(&deal.id, None).await?;
    assert_eq!(anonymous.status, 400);
    assert_eq!(anonymous.err_msg(), Some("No user id provided!"));
    let empty = ctx.api.claim_deal(&deal.id, Some("")).await?;
    assert_eq!(empty.status, 400);
    assert_eq!(ctx.api.get_deal(&deal.id).await?.result?.claimed_count, 0);

    // The user is checked before the deal is looked up
    let unknown = ctx.api.claim_deal("no-such-deal", None).await?;
    assert_eq!(unknown.status, 400);
    assert_eq!(unknown.err_msg(), Some("No user id provided!"));

    ctx.finish().await;
    Ok(())
}

#[tokio::test]
#[ntest::timeout(20_000)]
async fn test_create_accepts_reposted_deal() -> Result<()> {
    let ctx = TestCtxBuilder::from_env()?.build().await?;
    let deal = open_deal(&ctx, 4, Duration::hours(1)).await?;

    let body = serde_json::to_string(&deal)?;
    let copy = ctx.api.create_deal_raw(body).await?.result?;
    assert_ne!(copy.id, deal.id, "A reposted deal must get a fresh id.");
    assert_eq!(copy.item_count, deal.item_count);
    assert_eq!(copy.end_time, deal.end_time);
    assert_eq!(ctx.api.list_deals().await?.result?.len(), 2);

    ctx.finish().await;
    Ok(())
}
