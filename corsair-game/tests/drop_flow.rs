//! End-to-end draw, bonus, and sweep flows over the in-memory store.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use corsair_game::{
    CatalogData, ClaimOutcome, DailyReward, DrawOutcome, Game, MemoryStore, UserId, wait_parts,
};

fn new_game() -> Game<MemoryStore> {
    let _ = env_logger::builder().is_test(true).try_init();
    Game::bootstrap(
        Arc::new(MemoryStore::new()),
        &CatalogData::default_data(),
        0xDEC0DE,
    )
    .expect("bootstrap embedded catalog")
}

fn at(day: u32, hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, day, hour, minute, second).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
}

#[test]
fn new_user_walkthrough() {
    let game = new_game();
    let user = UserId(501);
    let start = at(7, 9, 0, 0);

    // First draw always succeeds.
    let first = game.draw(user, start).unwrap();
    assert!(matches!(first, DrawOutcome::Drawn(_)));

    // An immediate retry is denied with roughly the full cooldown left.
    let denied = game.draw(user, start + Duration::seconds(1)).unwrap();
    let DrawOutcome::Denied { wait } = denied else {
        panic!("expected denial, got {denied:?}");
    };
    assert_eq!(wait_parts(wait), (1, 59));

    // Claim the extra-draw bonus and spend it straight away.
    let claimed = game
        .claim_daily(user, DailyReward::ExtraDraw, day(7), start)
        .unwrap();
    assert_eq!(claimed, ClaimOutcome::Claimed(DailyReward::ExtraDraw));

    let via_credit = game.draw(user, start + Duration::seconds(2)).unwrap();
    assert!(matches!(via_credit, DrawOutcome::Drawn(_)));

    // The credit is gone, so the next immediate draw is denied again.
    let third = game.draw(user, start + Duration::seconds(3)).unwrap();
    assert!(matches!(third, DrawOutcome::Denied { .. }));

    let summary = game.collection_summary(user).unwrap();
    assert_eq!(summary.total_cards, 2);
}

#[test]
fn cooldown_window_reopens_on_the_boundary() {
    let game = new_game();
    let user = UserId(502);
    let start = at(7, 9, 0, 0);

    game.draw(user, start).unwrap();
    assert!(matches!(
        game.draw(user, start + Duration::hours(2) - Duration::seconds(1))
            .unwrap(),
        DrawOutcome::Denied { .. }
    ));
    assert!(matches!(
        game.draw(user, start + Duration::hours(2)).unwrap(),
        DrawOutcome::Drawn(_)
    ));
}

#[test]
fn rarity_boost_applies_to_one_draw_only() {
    let game = new_game();
    let user = UserId(503);
    let start = at(7, 9, 0, 0);

    game.claim_daily(user, DailyReward::RarityBoost, day(7), start)
        .unwrap();
    let status = game.bonus_status(user, day(7)).unwrap();
    assert!((status.rarity_bonus - 10.0).abs() < f64::EPSILON);
    assert!(!status.daily_available);

    game.draw(user, start).unwrap();

    let status = game.bonus_status(user, day(7)).unwrap();
    assert!((status.rarity_bonus - 0.0).abs() < f64::EPSILON);
}

#[test]
fn daily_claim_is_exclusive_and_once_per_day() {
    let game = new_game();
    let user = UserId(504);
    let start = at(7, 9, 0, 0);

    assert!(game.can_claim_daily(user, day(7)).unwrap());
    game.claim_daily(user, DailyReward::RarityBoost, day(7), start)
        .unwrap();
    assert!(!game.can_claim_daily(user, day(7)).unwrap());

    let second = game
        .claim_daily(user, DailyReward::ExtraDraw, day(7), start)
        .unwrap();
    assert_eq!(second, ClaimOutcome::AlreadyClaimed);

    // The rejected claim must not have granted the other reward.
    let status = game.bonus_status(user, day(7)).unwrap();
    assert_eq!(status.extra_draws, 0);
    assert!((status.rarity_bonus - 10.0).abs() < f64::EPSILON);

    // Next calendar day the claim reopens.
    assert!(game.can_claim_daily(user, day(8)).unwrap());
}

#[test]
fn nightly_sweep_clears_only_stale_claims() {
    let game = new_game();
    let start = at(7, 9, 0, 0);
    let fresh = UserId(505);
    let stale = UserId(506);

    game.claim_daily(fresh, DailyReward::RarityBoost, day(7), start)
        .unwrap();
    game.claim_daily(stale, DailyReward::ExtraDraw, day(6), start)
        .unwrap();

    assert_eq!(game.nightly_sweep(day(7)).unwrap(), 1);

    let fresh_status = game.bonus_status(fresh, day(7)).unwrap();
    assert!((fresh_status.rarity_bonus - 10.0).abs() < f64::EPSILON);
    let stale_status = game.bonus_status(stale, day(7)).unwrap();
    assert_eq!(stale_status.extra_draws, 0);

    // Running the sweep again is a no-op.
    assert_eq!(game.nightly_sweep(day(7)).unwrap(), 0);
}

#[test]
fn leaderboard_ranks_collectors_via_facade() {
    let game = new_game();
    let start = at(7, 9, 0, 0);
    let solo = UserId(507);
    let pair = UserId(508);

    game.register(solo, Some("Sable"), start).unwrap();
    game.register(pair, Some("Quill"), start).unwrap();

    game.draw(solo, start).unwrap();
    game.draw(pair, start).unwrap();
    game.draw(pair, start + Duration::hours(2)).unwrap();

    let rows = game.leaderboard(None).unwrap();
    assert_eq!(rows.len(), 2);
    let pair_row = rows.iter().find(|row| row.user == pair).unwrap();
    assert_eq!(pair_row.total_cards, 2);
    assert_eq!(pair_row.display_name.as_deref(), Some("Quill"));
}

#[test]
fn profile_tracks_registration_and_draws() {
    let game = new_game();
    let user = UserId(509);
    let start = at(1, 9, 0, 0);

    game.register(user, Some("Vane"), start).unwrap();
    game.draw(user, start).unwrap();

    let profile = game.profile(user, at(7, 9, 0, 0)).unwrap().unwrap();
    assert_eq!(profile.days_playing, 6);
    assert_eq!(profile.stats.count, 1);
    assert_eq!(profile.last_draw, Some(start));

    assert!(game.profile(UserId(999), start).unwrap().is_none());
}
