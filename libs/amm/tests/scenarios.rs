//! End-to-end exchange scenarios
//!
//! Each test drives the public engines through an in-memory balance book and
//! checks both the returned figures and the ledger state left behind,
//! including that failed operations leave nothing behind.

mod common;

use amm_config::{AmmSettings, BatchMode, DEFAULT_MINIMUM_LIQUIDITY};
use common::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use torq_amm::{
    ArbitrageRequest, BatchLeg, BatchSwapRequest, DepositRequest, ExchangeError, ExchangeEvent,
    PathSwapRequest, SwapRequest, WithdrawRequest, ZapRequest,
};
use types::PairId;

const A: u64 = 1;
const B: u64 = 2;
const C: u64 = 3;
const D: u64 = 4;
const HUB: u64 = 5;

const TRADER: u64 = 10;
const RECIPIENT: u64 = 11;

fn path_request(path: &[u64], amount_in: Decimal, min_amount_out: Decimal) -> PathSwapRequest {
    PathSwapRequest {
        path: path.iter().map(|n| asset(*n)).collect(),
        amount_in,
        min_amount_out,
        sender: account(TRADER),
        recipient: account(RECIPIENT),
        deadline: DEADLINE,
    }
}

/// Settings locking 1000 whole shares on each first deposit
fn whole_unit_lock() -> AmmSettings {
    AmmSettings {
        minimum_liquidity: dec!(1000),
        ..AmmSettings::default()
    }
}

/// A/B, B/C and C/A pools; `c_a` sets the C/A reserves
fn triangle(ex: &TestExchange, c_a: (Decimal, Decimal)) -> (PairId, PairId, PairId) {
    let ab = ex.seed_pair(asset(A), asset(B), dec!(10000), dec!(10000));
    let bc = ex.seed_pair(asset(B), asset(C), dec!(10000), dec!(10000));
    let ca = ex.seed_pair(asset(C), asset(A), c_a.0, c_a.1);
    (ab, bc, ca)
}

#[test]
fn test_swap_scenario_exact_figures() {
    let settings = AmmSettings {
        minimum_liquidity: dec!(100),
        ..AmmSettings::default()
    };
    let ex = TestExchange::with_settings(settings);
    let pair = ex.seed_pair(asset(A), asset(B), dec!(1000), dec!(1000));
    ex.fund(asset(A), account(TRADER), dec!(100));

    let result = ex
        .core
        .swaps()
        .swap(&SwapRequest {
            asset_in: asset(A),
            asset_out: asset(B),
            amount_in: dec!(100),
            min_amount_out: dec!(0),
            sender: account(TRADER),
            recipient: account(RECIPIENT),
            deadline: DEADLINE,
        })
        .unwrap();

    // 99.7 * 1000 / 1099.7, truncated to 12 places
    assert_eq!(result.fee, dec!(0.3));
    assert_eq!(result.amount_out, dec!(90.661089388014));

    let state = ex.snapshot(pair);
    assert_eq!(state.reserve_of(asset(A)), Some(dec!(1100)));
    assert_eq!(state.reserve_of(asset(B)), Some(dec!(909.338910611986)));
    assert_eq!(ex.balance(asset(B), account(RECIPIENT)), dec!(90.661089388014));

    assert_eq!(
        ex.events.events()[1],
        ExchangeEvent::FeesAccrued {
            pair,
            asset: asset(A),
            amount: dec!(0.3),
            timestamp: NOW,
        }
    );
}

#[test]
fn test_first_deposit_scenario() {
    let ex = TestExchange::with_settings(whole_unit_lock());
    let pair = ex.core.create_pair(asset(A), asset(B), None).unwrap().id;
    ex.fund(asset(A), account(TRADER), dec!(1000));
    ex.fund(asset(B), account(TRADER), dec!(4000));

    let result = ex
        .core
        .liquidity()
        .deposit(&DepositRequest {
            pair,
            desired_a: dec!(1000),
            desired_b: dec!(4000),
            min_a: dec!(1000),
            min_b: dec!(4000),
            provider: account(TRADER),
            recipient: account(TRADER),
            deadline: DEADLINE,
        })
        .unwrap();

    // sqrt(1000 * 4000) - 1000
    assert_eq!(result.shares_minted, dec!(1000));
    let state = ex.snapshot(pair);
    assert_eq!((state.reserve_a, state.reserve_b), (dec!(1000), dec!(4000)));
    assert_eq!(state.total_shares, dec!(2000));
    assert_eq!(ex.balance(asset(A), account(TRADER)), dec!(0));
}

#[test]
fn test_small_first_deposit_with_default_lock() {
    let ex = TestExchange::new();
    let pair = ex.core.create_pair(asset(A), asset(B), None).unwrap().id;
    ex.fund(asset(A), account(TRADER), dec!(10));
    ex.fund(asset(B), account(TRADER), dec!(150));

    let result = ex
        .core
        .liquidity()
        .deposit(&DepositRequest {
            pair,
            desired_a: dec!(10),
            desired_b: dec!(150),
            min_a: dec!(0),
            min_b: dec!(0),
            provider: account(TRADER),
            recipient: account(TRADER),
            deadline: DEADLINE,
        })
        .unwrap();

    // sqrt(1500) is about 38.73; only the sub-unit lock is withheld
    assert!(result.shares_minted > dec!(38.7));
    let state = ex.snapshot(pair);
    assert_eq!((state.reserve_a, state.reserve_b), (dec!(10), dec!(150)));
    assert_eq!(
        state.total_shares - result.shares_minted,
        DEFAULT_MINIMUM_LIQUIDITY
    );
    assert_eq!(
        ex.core.ledger().position(pair, account(TRADER)),
        result.shares_minted
    );
}

#[test]
fn test_slippage_scenario_leaves_reserves_unchanged() {
    let ex = TestExchange::new();
    let pair = ex.seed_pair(asset(A), asset(B), dec!(5000), dec!(5000));
    ex.fund(asset(A), account(TRADER), dec!(100));
    let before = ex.snapshot(pair);

    let quoted = ex.core.swaps().quote(asset(A), asset(B), dec!(100)).unwrap();
    let err = ex
        .core
        .swaps()
        .swap(&SwapRequest {
            asset_in: asset(A),
            asset_out: asset(B),
            amount_in: dec!(100),
            min_amount_out: quoted.amount_out + dec!(0.000000000001),
            sender: account(TRADER),
            recipient: account(TRADER),
            deadline: DEADLINE,
        })
        .unwrap_err();

    assert!(matches!(err, ExchangeError::SlippageExceeded { .. }));
    assert_eq!(ex.snapshot(pair), before);
    assert_eq!(ex.balance(asset(A), account(TRADER)), dec!(100));
    assert!(ex.events.events().is_empty());
}

#[test]
fn test_expired_request_changes_nothing() {
    let ex = TestExchange::new();
    let pair = ex.seed_pair(asset(A), asset(B), dec!(5000), dec!(5000));
    ex.fund(asset(A), account(TRADER), dec!(100));
    ex.clock.advance(3600);

    let err = ex
        .core
        .router()
        .swap_exact_in_path(&path_request(&[A, B], dec!(100), dec!(0)))
        .unwrap_err();

    assert_eq!(
        err,
        ExchangeError::Expired {
            deadline: DEADLINE,
            now: NOW + 3600
        }
    );
    assert_eq!(ex.reserve(pair, asset(A)), dec!(5000));
}

#[test]
fn test_multi_hop_settles_only_ends() {
    let ex = TestExchange::new();
    let ab = ex.seed_pair(asset(A), asset(B), dec!(10000), dec!(10000));
    let bc = ex.seed_pair(asset(B), asset(C), dec!(10000), dec!(10000));
    ex.fund(asset(A), account(TRADER), dec!(100));

    let quoted = ex.core.router().quote_path(&[asset(A), asset(B), asset(C)], dec!(100)).unwrap();
    let result = ex
        .core
        .router()
        .swap_exact_in_path(&path_request(&[A, B, C], dec!(100), dec!(95)))
        .unwrap();

    assert_eq!(result.amount_out, quoted.amount_out);
    assert_eq!(result.hops.len(), 2);
    assert_eq!(result.hops[0].amount_out, result.hops[1].amount_in);

    assert_eq!(ex.balance(asset(A), account(TRADER)), dec!(0));
    assert_eq!(ex.balance(asset(B), account(TRADER)), dec!(0));
    assert_eq!(ex.balance(asset(B), account(RECIPIENT)), dec!(0));
    assert_eq!(ex.balance(asset(C), account(RECIPIENT)), result.amount_out);

    assert_eq!(ex.reserve(ab, asset(A)), dec!(10100));
    assert_eq!(ex.reserve(bc, asset(B)), dec!(10000) + result.hops[0].amount_out);

    let recipients: Vec<_> = ex
        .events
        .events()
        .into_iter()
        .filter_map(|event| match event {
            ExchangeEvent::Swap { recipient, .. } => Some(recipient),
            _ => None,
        })
        .collect();
    assert_eq!(recipients, vec![None, Some(account(RECIPIENT))]);
}

#[test]
fn test_multi_hop_through_inactive_pair_rolls_back() {
    let ex = TestExchange::new();
    let ab = ex.seed_pair(asset(A), asset(B), dec!(10000), dec!(10000));
    let bc = ex.seed_pair(asset(B), asset(C), dec!(10000), dec!(10000));
    ex.core.set_active(bc, false).unwrap();
    ex.events.drain();
    ex.fund(asset(A), account(TRADER), dec!(100));
    let (ab_before, bc_before) = (ex.snapshot(ab), ex.snapshot(bc));

    let err = ex
        .core
        .router()
        .swap_exact_in_path(&path_request(&[A, B, C], dec!(100), dec!(0)))
        .unwrap_err();

    assert_eq!(err, ExchangeError::PairInactive { pair: bc });
    assert_eq!(ex.snapshot(ab), ab_before);
    assert_eq!(ex.snapshot(bc), bc_before);
    assert_eq!(ex.balance(asset(A), account(TRADER)), dec!(100));
    assert!(ex.events.events().is_empty());
}

#[test]
fn test_multi_hop_through_missing_pair_rolls_back() {
    let ex = TestExchange::new();
    let ab = ex.seed_pair(asset(A), asset(B), dec!(10000), dec!(10000));
    ex.fund(asset(A), account(TRADER), dec!(100));
    let before = ex.snapshot(ab);

    let err = ex
        .core
        .router()
        .swap_exact_in_path(&path_request(&[A, B, D], dec!(100), dec!(0)))
        .unwrap_err();

    assert!(matches!(err, ExchangeError::PairNotFound { .. }));
    assert_eq!(ex.snapshot(ab), before);
}

#[test]
fn test_multi_hop_final_slippage() {
    let ex = TestExchange::new();
    let ab = ex.seed_pair(asset(A), asset(B), dec!(10000), dec!(10000));
    ex.seed_pair(asset(B), asset(C), dec!(10000), dec!(10000));
    ex.fund(asset(A), account(TRADER), dec!(100));

    let err = ex
        .core
        .router()
        .swap_exact_in_path(&path_request(&[A, B, C], dec!(100), dec!(99)))
        .unwrap_err();
    assert!(matches!(err, ExchangeError::SlippageExceeded { .. }));
    assert_eq!(ex.reserve(ab, asset(A)), dec!(10000));
}

#[test]
fn test_unprofitable_arbitrage_rolls_back() {
    let ex = TestExchange::new();
    let (ab, bc, ca) = triangle(&ex, (dec!(10000), dec!(10000)));
    ex.fund(asset(A), account(TRADER), dec!(100));
    let before = [ex.snapshot(ab), ex.snapshot(bc), ex.snapshot(ca)];

    let err = ex
        .core
        .router()
        .arbitrage(&ArbitrageRequest {
            path: vec![asset(A), asset(B), asset(C), asset(A)],
            amount_in: dec!(100),
            min_profit: dec!(0),
            trader: account(TRADER),
            deadline: DEADLINE,
        })
        .unwrap_err();

    assert!(matches!(err, ExchangeError::NoProfitableArbitrage { .. }));
    assert_eq!([ex.snapshot(ab), ex.snapshot(bc), ex.snapshot(ca)], before);
    assert_eq!(ex.balance(asset(A), account(TRADER)), dec!(100));
}

#[test]
fn test_profitable_arbitrage_respects_min_profit() {
    let ex = TestExchange::new();
    // A is twice as expensive in the C/A pool
    let (ab, _, ca) = triangle(&ex, (dec!(10000), dec!(20000)));
    ex.fund(asset(A), account(TRADER), dec!(100));
    let request = |min_profit| ArbitrageRequest {
        path: vec![asset(A), asset(B), asset(C), asset(A)],
        amount_in: dec!(100),
        min_profit,
        trader: account(TRADER),
        deadline: DEADLINE,
    };

    let err = ex.core.router().arbitrage(&request(dec!(1000))).unwrap_err();
    assert!(matches!(err, ExchangeError::InsufficientProfit { .. }));
    assert_eq!(ex.reserve(ab, asset(A)), dec!(10000));

    let result = ex.core.router().arbitrage(&request(dec!(50))).unwrap();
    assert!(result.profit > dec!(50));
    assert_eq!(result.amount_out, dec!(100) + result.profit);
    assert_eq!(ex.balance(asset(A), account(TRADER)), result.amount_out);
    assert_eq!(ex.reserve(ca, asset(A)), dec!(20000) - result.amount_out);
}

#[test]
fn test_arbitrage_requires_cycle() {
    let ex = TestExchange::new();
    triangle(&ex, (dec!(10000), dec!(10000)));
    let err = ex
        .core
        .router()
        .arbitrage(&ArbitrageRequest {
            path: vec![asset(A), asset(B), asset(C)],
            amount_in: dec!(1),
            min_profit: dec!(0),
            trader: account(TRADER),
            deadline: DEADLINE,
        })
        .unwrap_err();
    assert!(matches!(err, ExchangeError::InvalidPath { .. }));
}

fn batch(mode: BatchMode) -> BatchSwapRequest {
    BatchSwapRequest {
        legs: vec![
            BatchLeg {
                path: vec![asset(A), asset(B)],
                amount_in: dec!(100),
                min_amount_out: dec!(0),
            },
            BatchLeg {
                path: vec![asset(B), asset(C)],
                amount_in: dec!(100),
                min_amount_out: dec!(1000000),
            },
        ],
        sender: account(TRADER),
        recipient: account(RECIPIENT),
        deadline: DEADLINE,
        mode: Some(mode),
    }
}

#[test]
fn test_batch_all_or_nothing() {
    let ex = TestExchange::new();
    let ab = ex.seed_pair(asset(A), asset(B), dec!(10000), dec!(10000));
    ex.seed_pair(asset(B), asset(C), dec!(10000), dec!(10000));
    ex.fund(asset(A), account(TRADER), dec!(100));
    ex.fund(asset(B), account(TRADER), dec!(100));

    let err = ex.core.router().batch_swap(&batch(BatchMode::AllOrNothing)).unwrap_err();
    assert!(matches!(err, ExchangeError::SlippageExceeded { .. }));
    assert_eq!(ex.reserve(ab, asset(A)), dec!(10000));
    assert_eq!(ex.balance(asset(A), account(TRADER)), dec!(100));
    assert_eq!(ex.balance(asset(B), account(RECIPIENT)), dec!(0));
}

#[test]
fn test_batch_defaults_to_configured_mode() {
    let settings = AmmSettings {
        batch_mode: BatchMode::BestEffort,
        ..AmmSettings::default()
    };
    let ex = TestExchange::with_settings(settings);
    let ab = ex.seed_pair(asset(A), asset(B), dec!(10000), dec!(10000));
    ex.seed_pair(asset(B), asset(C), dec!(10000), dec!(10000));
    ex.fund(asset(A), account(TRADER), dec!(100));
    ex.fund(asset(B), account(TRADER), dec!(100));

    let mut request = batch(BatchMode::BestEffort);
    request.mode = None;
    let result = ex.core.router().batch_swap(&request).unwrap();

    assert_eq!(result.mode, BatchMode::BestEffort);
    assert_eq!(result.succeeded(), 1);
    assert!(matches!(
        result.legs[1],
        Err(ExchangeError::SlippageExceeded { .. })
    ));
    assert_eq!(ex.reserve(ab, asset(A)), dec!(10100));
    assert_eq!(ex.balance(asset(B), account(TRADER)), dec!(100));
}

#[test]
fn test_empty_batch_rejected() {
    let ex = TestExchange::new();
    let mut request = batch(BatchMode::AllOrNothing);
    request.legs.clear();
    assert!(matches!(
        ex.core.router().batch_swap(&request),
        Err(ExchangeError::InvalidPath { .. })
    ));
}

#[test]
fn test_optimal_path_prefers_better_output() {
    let settings = AmmSettings {
        hub_assets: vec![asset(HUB)],
        ..AmmSettings::default()
    };
    let ex = TestExchange::with_settings(settings);
    ex.seed_pair(asset(A), asset(C), dec!(2000), dec!(2000));
    ex.seed_pair(asset(A), asset(HUB), dec!(100000), dec!(100000));
    ex.seed_pair(asset(HUB), asset(C), dec!(100000), dec!(100000));
    let router = ex.core.router();

    let large = router.find_optimal_path(asset(A), asset(C), dec!(200)).unwrap().unwrap();
    assert_eq!(large.path, vec![asset(A), asset(HUB), asset(C)]);

    let small = router.find_optimal_path(asset(A), asset(C), dec!(1)).unwrap().unwrap();
    assert_eq!(small.path, vec![asset(A), asset(C)]);
    assert!(small.price_impact_bps >= Decimal::ZERO);
}

#[test]
fn test_optimal_path_without_hubs_uses_shared_neighbours() {
    let ex = TestExchange::new();
    ex.seed_pair(asset(A), asset(HUB), dec!(10000), dec!(10000));
    ex.seed_pair(asset(HUB), asset(C), dec!(10000), dec!(10000));
    let router = ex.core.router();

    let route = router.find_optimal_path(asset(A), asset(C), dec!(10)).unwrap().unwrap();
    assert_eq!(route.path, vec![asset(A), asset(HUB), asset(C)]);

    assert_eq!(router.find_optimal_path(asset(A), asset(D), dec!(10)).unwrap(), None);
}

#[test]
fn test_zap_from_pair_side_refunds_remainder() {
    let ex = TestExchange::new();
    let pair = ex.seed_pair(asset(A), asset(B), dec!(10000), dec!(10000));
    ex.fund(asset(A), account(TRADER), dec!(1000));

    let result = ex
        .core
        .router()
        .zap(&ZapRequest {
            asset_in: asset(A),
            amount_in: dec!(1000),
            pair,
            min_shares: dec!(1),
            sender: account(TRADER),
            recipient: account(TRADER),
            deadline: DEADLINE,
        })
        .unwrap();

    assert_eq!(result.swaps.len(), 1);
    assert!(result.shares_minted > dec!(0));
    assert_eq!(result.amount_a + result.refund_a, dec!(500));
    assert_eq!(result.amount_b + result.refund_b, result.swaps[0].amount_out);
    assert_eq!(
        ex.core.ledger().position(pair, account(TRADER)),
        result.shares_minted
    );
    assert_eq!(ex.balance(asset(A), account(TRADER)), result.refund_a);
    assert_eq!(ex.balance(asset(B), account(TRADER)), result.refund_b);
}

#[test]
fn test_zap_min_shares_rolls_back() {
    let ex = TestExchange::new();
    let pair = ex.seed_pair(asset(A), asset(B), dec!(10000), dec!(10000));
    ex.fund(asset(A), account(TRADER), dec!(1000));
    let before = ex.snapshot(pair);

    let err = ex
        .core
        .router()
        .zap(&ZapRequest {
            asset_in: asset(A),
            amount_in: dec!(1000),
            pair,
            min_shares: dec!(100000),
            sender: account(TRADER),
            recipient: account(TRADER),
            deadline: DEADLINE,
        })
        .unwrap_err();

    assert!(matches!(err, ExchangeError::SlippageExceeded { .. }));
    assert_eq!(ex.snapshot(pair), before);
    assert_eq!(ex.balance(asset(A), account(TRADER)), dec!(1000));
}

#[test]
fn test_zap_from_outside_asset_routes_both_sides() {
    let settings = AmmSettings {
        hub_assets: vec![asset(HUB)],
        ..AmmSettings::default()
    };
    let ex = TestExchange::with_settings(settings);
    let pair = ex.seed_pair(asset(A), asset(B), dec!(10000), dec!(10000));
    ex.seed_pair(asset(HUB), asset(A), dec!(10000), dec!(10000));
    ex.seed_pair(asset(HUB), asset(B), dec!(10000), dec!(10000));
    ex.fund(asset(HUB), account(TRADER), dec!(200));

    let result = ex
        .core
        .router()
        .zap(&ZapRequest {
            asset_in: asset(HUB),
            amount_in: dec!(200),
            pair,
            min_shares: dec!(0),
            sender: account(TRADER),
            recipient: account(RECIPIENT),
            deadline: DEADLINE,
        })
        .unwrap();

    assert_eq!(result.swaps.len(), 2);
    assert!(result.shares_minted > dec!(0));
    assert_eq!(ex.balance(asset(HUB), account(TRADER)), dec!(0));
    assert_eq!(
        ex.core.ledger().position(pair, account(RECIPIENT)),
        result.shares_minted
    );
}

#[test]
fn test_deposit_withdraw_round_trip() {
    let ex = TestExchange::new();
    let pair = ex.seed_pair(asset(A), asset(B), dec!(1000), dec!(4000));
    let provider = account(TRADER);
    ex.fund(asset(A), provider, dec!(100));
    ex.fund(asset(B), provider, dec!(400));

    let deposit = ex
        .core
        .liquidity()
        .deposit(&DepositRequest {
            pair,
            desired_a: dec!(100),
            desired_b: dec!(400),
            min_a: dec!(0),
            min_b: dec!(0),
            provider,
            recipient: provider,
            deadline: DEADLINE,
        })
        .unwrap();

    let withdraw = ex
        .core
        .liquidity()
        .withdraw(&WithdrawRequest {
            pair,
            shares: deposit.shares_minted,
            min_a: dec!(0),
            min_b: dec!(0),
            provider,
            recipient: provider,
            deadline: DEADLINE,
        })
        .unwrap();

    assert_eq!((withdraw.amount_a, withdraw.amount_b), (dec!(100), dec!(400)));
    assert_eq!(ex.balance(asset(A), provider), dec!(100));
    assert_eq!(ex.core.ledger().position(pair, provider), dec!(0));
    assert!(ex
        .core
        .ledger()
        .positions_for_pair(pair)
        .iter()
        .all(|(holder, _)| *holder != provider));

    let kinds: Vec<_> = ex.events.events().iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, vec!["liquidity_added", "liquidity_removed"]);
}

#[test]
fn test_withdraw_allowed_from_inactive_pair() {
    let ex = TestExchange::with_settings(whole_unit_lock());
    let pair = ex.seed_pair(asset(A), asset(B), dec!(1000), dec!(4000));
    ex.core.set_active(pair, false).unwrap();

    let seeder = account(SEEDER);
    let shares = ex.core.ledger().position(pair, seeder);
    let result = ex
        .core
        .liquidity()
        .withdraw(&WithdrawRequest {
            pair,
            shares,
            min_a: dec!(0),
            min_b: dec!(0),
            provider: seeder,
            recipient: seeder,
            deadline: DEADLINE,
        })
        .unwrap();

    // the locked minimum keeps half the pool
    assert_eq!((result.amount_a, result.amount_b), (dec!(500), dec!(2000)));
    let state = ex.snapshot(pair);
    assert_eq!(state.total_shares, dec!(1000));
    assert!(state.is_consistent());
}

#[test]
fn test_withdraw_below_minimum_changes_nothing() {
    let ex = TestExchange::new();
    let pair = ex.seed_pair(asset(A), asset(B), dec!(1000), dec!(4000));
    let seeder = account(SEEDER);
    let before = ex.snapshot(pair);
    let held = ex.core.ledger().position(pair, seeder);

    // 500 of 2000 shares releases (250, 1000)
    let err = ex
        .core
        .liquidity()
        .withdraw(&WithdrawRequest {
            pair,
            shares: dec!(500),
            min_a: dec!(250),
            min_b: dec!(1001),
            provider: seeder,
            recipient: account(RECIPIENT),
            deadline: DEADLINE,
        })
        .unwrap_err();

    assert_eq!(
        err,
        ExchangeError::InsufficientAmount {
            asset: asset(B),
            amount: dec!(1000),
            minimum: dec!(1001),
        }
    );
    assert_eq!(ex.snapshot(pair), before);
    assert_eq!(ex.core.ledger().position(pair, seeder), held);
    assert_eq!(ex.core.ledger().position(pair, account(RECIPIENT)), dec!(0));
    assert_eq!(ex.balance(asset(A), account(RECIPIENT)), dec!(0));
    assert_eq!(ex.balance(asset(B), account(RECIPIENT)), dec!(0));
    assert!(ex.events.events().is_empty());
}

#[test]
fn test_expired_liquidity_requests_change_nothing() {
    let ex = TestExchange::new();
    let pair = ex.seed_pair(asset(A), asset(B), dec!(1000), dec!(4000));
    let seeder = account(SEEDER);
    ex.fund(asset(A), account(TRADER), dec!(100));
    ex.fund(asset(B), account(TRADER), dec!(400));
    let before = ex.snapshot(pair);
    let held = ex.core.ledger().position(pair, seeder);
    ex.clock.set(DEADLINE + 1);

    let expired = ExchangeError::Expired {
        deadline: DEADLINE,
        now: DEADLINE + 1,
    };
    let deposit = ex.core.liquidity().deposit(&DepositRequest {
        pair,
        desired_a: dec!(100),
        desired_b: dec!(400),
        min_a: dec!(0),
        min_b: dec!(0),
        provider: account(TRADER),
        recipient: account(TRADER),
        deadline: DEADLINE,
    });
    assert_eq!(deposit, Err(expired.clone()));

    let withdraw = ex.core.liquidity().withdraw(&WithdrawRequest {
        pair,
        shares: dec!(100),
        min_a: dec!(0),
        min_b: dec!(0),
        provider: seeder,
        recipient: seeder,
        deadline: DEADLINE,
    });
    assert_eq!(withdraw, Err(expired));

    assert_eq!(ex.snapshot(pair), before);
    assert_eq!(ex.core.ledger().position(pair, seeder), held);
    assert_eq!(ex.core.ledger().position(pair, account(TRADER)), dec!(0));
    assert_eq!(ex.balance(asset(A), account(TRADER)), dec!(100));
    assert_eq!(ex.balance(asset(B), account(TRADER)), dec!(400));
    assert!(ex.events.events().is_empty());
}

#[test]
fn test_rejected_liquidity_requests_keep_positions() {
    let ex = TestExchange::new();
    let pair = ex.seed_pair(asset(A), asset(B), dec!(1000), dec!(4000));
    ex.fund(asset(A), account(TRADER), dec!(300));
    ex.fund(asset(B), account(TRADER), dec!(3000));

    let request = |desired_b, min_b| DepositRequest {
        pair,
        desired_a: dec!(100),
        desired_b,
        min_a: dec!(0),
        min_b,
        provider: account(TRADER),
        recipient: account(RECIPIENT),
        deadline: DEADLINE,
    };
    let first = ex
        .core
        .liquidity()
        .deposit(&request(dec!(400), dec!(0)))
        .unwrap();
    assert_eq!(first.shares_minted, dec!(200));
    let before = ex.snapshot(pair);

    // pairing takes only 400 of b, below the requested floor
    let err = ex
        .core
        .liquidity()
        .deposit(&request(dec!(1000), dec!(500)))
        .unwrap_err();
    assert!(matches!(err, ExchangeError::InsufficientAmount { .. }));
    assert_eq!(ex.core.ledger().position(pair, account(RECIPIENT)), dec!(200));

    // the holder redeeming to a third account with an unmet floor
    let err = ex
        .core
        .liquidity()
        .withdraw(&WithdrawRequest {
            pair,
            shares: dec!(200),
            min_a: dec!(101),
            min_b: dec!(0),
            provider: account(RECIPIENT),
            recipient: account(TRADER),
            deadline: DEADLINE,
        })
        .unwrap_err();
    assert!(matches!(err, ExchangeError::InsufficientAmount { .. }));

    // burning more than held
    let err = ex
        .core
        .liquidity()
        .withdraw(&WithdrawRequest {
            pair,
            shares: dec!(201),
            min_a: dec!(0),
            min_b: dec!(0),
            provider: account(RECIPIENT),
            recipient: account(RECIPIENT),
            deadline: DEADLINE,
        })
        .unwrap_err();
    assert!(matches!(err, ExchangeError::InsufficientShares { .. }));

    assert_eq!(ex.snapshot(pair), before);
    assert_eq!(ex.core.ledger().position(pair, account(RECIPIENT)), dec!(200));
    assert_eq!(ex.core.ledger().position(pair, account(TRADER)), dec!(0));
    assert_eq!(ex.balance(asset(A), account(TRADER)), dec!(200));
    assert_eq!(ex.balance(asset(B), account(TRADER)), dec!(2600));
}
