// Property-based tests for the normalizer, views and cross-reference.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use chrono::NaiveTime;
use proptest::prelude::*;
use sabana_engine::view::{parse_time, COUNT_COLUMN};
use sabana_engine::*;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Headers as carriers write them, including duplicates and passthrough columns.
const HEADER_POOL: &[&str] = &[
    "Linea_A", "origen", " NUMERO_B ", "destino", "Lat", "latitude", "LONGITUD", "lon",
    "Hora", "time", "Fecha", "Celda", "IMEI",
];

fn arb_cell() -> impl Strategy<Value = Value> {
    prop_oneof![
        3 => r"[0-9]{3,10}(\.0)?".prop_map(Value::from),
        2 => (-90.0..90.0f64).prop_map(Value::number),
        1 => r"-?[0-9]{1,2},[0-9]{1,4}".prop_map(Value::from),
        1 => prop::sample::select(vec!["nan", "None", "", " ", "sin dato"]).prop_map(Value::from),
        1 => Just(Value::Empty),
    ]
}

fn arb_raw_table() -> impl Strategy<Value = Table> {
    prop::collection::vec(prop::sample::select(HEADER_POOL), 1..7).prop_flat_map(|headers| {
        let width = headers.len();
        let columns: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        prop::collection::vec(prop::collection::vec(arb_cell(), width), 0..20)
            .prop_map(move |rows| Table::from_rows(columns.clone(), rows))
    })
}

fn arb_hora() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => (0u32..24, 0u32..60, 0u32..60).prop_map(|(h, m, s)| format!("{h:02}:{m:02}:{s:02}")),
        1 => prop::sample::select(vec!["23:00:00", "06:00:00", "06:00:01", "22:59:59"]).prop_map(String::from),
        1 => r"[a-z0-9: ]{0,8}",
    ]
}

/// Normalized call table with a small coordinate grid so towers repeat.
fn arb_calls() -> impl Strategy<Value = Table> {
    let row = (
        prop::sample::select(vec!["300", "301", "302", UNKNOWN_LINE]),
        prop::sample::select(vec!["400", "401", "402", "403", UNKNOWN_LINE]),
        prop::option::of((0i32..6, 0i32..6)),
        arb_hora(),
    );
    prop::collection::vec(row, 0..60).prop_map(|rows| {
        let columns = ["linea_a", "linea_b", "latitud", "longitud", "hora"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let rows = rows
            .into_iter()
            .map(|(a, b, pos, hora)| {
                let (lat, lon) = match pos {
                    Some((x, y)) => (Value::number(10.0 + x as f64 * 0.01), Value::number(-74.0 - y as f64 * 0.01)),
                    None => (Value::Empty, Value::Empty),
                };
                vec![a.into(), b.into(), lat, lon, hora.into()]
            })
            .collect();
        Table::from_rows(columns, rows)
    })
}

fn t(h: u32, m: u32, s: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, s).unwrap()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn normalizer_is_idempotent(raw in arb_raw_table()) {
        let profile = Profile::default();
        let (once, _) = normalize(raw, &profile);
        let (twice, report) = normalize(once.clone(), &profile);
        prop_assert_eq!(&twice, &once);
        prop_assert_eq!(report.coordinates_coerced, 0);
    }

    #[test]
    fn overview_is_identity(calls in arb_calls()) {
        let out = apply(&calls, &ViewRequest::Overview, &Profile::default()).unwrap();
        prop_assert_eq!(out.table, calls);
        prop_assert_eq!(out.status, ViewStatus::Applied);
    }

    #[test]
    fn overnight_keeps_exactly_the_window(calls in arb_calls()) {
        let out = apply(&calls, &ViewRequest::Overnight, &Profile::default()).unwrap();
        let kept: Vec<&str> = out.table.records().filter_map(|r| r.hora).collect();
        for h in &kept {
            let time = parse_time(h);
            prop_assert!(time.is_some_and(|x| x >= t(23, 0, 0) || x <= t(6, 0, 0)), "kept {}", h);
        }
        let kept_count = kept.len();
        let expected = calls
            .records()
            .filter_map(|r| r.hora.and_then(parse_time))
            .filter(|x| !(*x > t(6, 0, 0) && *x < t(23, 0, 0)))
            .count();
        prop_assert_eq!(kept_count, expected);
    }

    #[test]
    fn tower_ranking_is_bounded_and_sorted(calls in arb_calls()) {
        let out = apply(&calls, &ViewRequest::TowerRanking, &Profile::default()).unwrap();
        let ranking = out.table;
        prop_assert!(ranking.len() <= 15);
        let col = ranking.column_index(COUNT_COLUMN).unwrap();
        let counts: Vec<f64> = ranking.rows().iter().filter_map(|r| r[col].as_number()).collect();
        prop_assert_eq!(counts.len(), ranking.len());
        prop_assert!(counts.windows(2).all(|w| w[0] >= w[1]));
        prop_assert!(counts.iter().sum::<f64>() <= calls.len() as f64);
    }

    #[test]
    fn cross_reference_returns_primary_rows_in_order(
        primary in arb_calls(),
        secondary in arb_calls(),
        by_location in any::<bool>(),
    ) {
        let criterion = if by_location { MatchCriterion::Location } else { MatchCriterion::Identifier };
        let m = cross_reference(&primary, &secondary, criterion, 4).unwrap();
        prop_assert_eq!(m.table.columns(), primary.columns());
        // subsequence of the primary rows
        let mut source = primary.rows().iter();
        for row in m.table.rows() {
            prop_assert!(source.any(|r| r == row));
        }
        prop_assert_eq!(m.table.is_empty(), m.shared == 0);
    }

    #[test]
    fn sentinel_alone_never_matches(n1 in 0usize..30, n2 in 0usize..30) {
        let unknown = |n: usize| Table::from_rows(
            vec!["linea_a".into(), "linea_b".into()],
            vec![vec![UNKNOWN_LINE.into(), UNKNOWN_LINE.into()]; n],
        );
        let m = cross_reference(&unknown(n1), &unknown(n2), MatchCriterion::Identifier, 4).unwrap();
        prop_assert_eq!(m.shared, 0);
        prop_assert!(m.table.is_empty());
    }

    #[test]
    fn empty_query_returns_full_table(calls in arb_calls()) {
        let request = ViewRequest::NumberSearch { query: "", target: SearchTarget::Either };
        let out = apply(&calls, &request, &Profile::default()).unwrap();
        prop_assert_eq!(out.table, calls);
        let awaiting = matches!(out.status, ViewStatus::AwaitingInput { .. });
        prop_assert!(awaiting);
    }
}
