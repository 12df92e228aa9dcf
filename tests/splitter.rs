use chrono::{Duration, NaiveDate};
use panelcv::data::Panel;
use panelcv::engines::splitters::{DataSplitter, MultipleTimeSeriesCV, Split};
use panelcv::PanelCvError;
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{BTreeSet, HashMap};

/// d1 of the 300-day scenario
fn d(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 1, 1).unwrap() + Duration::days(n - 1)
}

/// `n_days` dates d1..dN with the given entities on each, optionally shuffled rows
fn build_panel(n_days: i64, entities: &[&str], shuffle_seed: Option<u64>) -> Panel {
    let mut rows: Vec<(String, NaiveDate)> = (1..=n_days)
        .flat_map(|n| entities.iter().map(move |e| (e.to_string(), d(n))))
        .collect();
    if let Some(seed) = shuffle_seed {
        rows.shuffle(&mut StdRng::seed_from_u64(seed));
    }

    let symbols: Vec<String> = rows.iter().map(|(s, _)| s.clone()).collect();
    let dates: Vec<NaiveDate> = rows.iter().map(|(_, date)| *date).collect();
    let values: Vec<f64> = (0..rows.len()).map(|i| i as f64).collect();

    let df = df! {
        "symbol" => symbols,
        "date" => dates,
        "feature" => values,
    }
    .unwrap();
    Panel::new(df, "symbol", "date").unwrap()
}

fn scenario_cv() -> MultipleTimeSeriesCV {
    MultipleTimeSeriesCV::with_lengths(2, 120, 21, 1).unwrap()
}

fn window_dates(panel: &Panel, positions: &[IdxSize]) -> BTreeSet<NaiveDate> {
    positions
        .iter()
        .map(|&p| panel.row_dates()[p as usize])
        .collect()
}

#[test]
fn test_reference_scenario_windows() {
    let panel = build_panel(300, &["AAPL", "MSFT"], None);
    let splits: Vec<Split> = scenario_cv().split_panel(&panel).unwrap().collect();

    assert_eq!(splits.len(), 2);

    let first = &splits[0];
    assert_eq!(first.test_range.end, d(300));
    assert_eq!(first.test_range.start, d(280));
    assert_eq!(first.test_positions.len(), 42);
    assert_eq!(first.train_range.end, d(278));
    assert_eq!(first.train_range.start, d(159));
    assert_eq!(first.train_positions.len(), 240);

    let second = &splits[1];
    assert_eq!(second.test_range.end, d(279));
    assert_eq!(second.test_range.start, d(259));
    assert_eq!(second.train_range.end, d(257));
    assert_eq!(second.train_range.start, d(138));
}

#[test]
fn test_window_sizes_in_unique_dates() {
    let panel = build_panel(300, &["A", "B", "C"], Some(7));
    let cv = MultipleTimeSeriesCV::with_lengths(5, 60, 10, 5).unwrap();

    for split in cv.split_panel(&panel).unwrap() {
        assert_eq!(window_dates(&panel, &split.train_positions).len(), 60);
        assert_eq!(window_dates(&panel, &split.test_positions).len(), 10);
    }
}

#[test]
fn test_lookahead_gap_between_train_and_test() {
    let panel = build_panel(200, &["A", "B"], None);
    let lookahead = 5;
    let cv = MultipleTimeSeriesCV::with_lengths(4, 50, 10, lookahead).unwrap();
    let dates_desc = panel.unique_dates_desc();

    for split in cv.split_panel(&panel).unwrap() {
        let train = window_dates(&panel, &split.train_positions);
        let test = window_dates(&panel, &split.test_positions);
        let max_train = *train.iter().next_back().unwrap();
        let min_test = *test.iter().next().unwrap();

        let between = dates_desc
            .iter()
            .filter(|&&date| date > max_train && date < min_test)
            .count();
        assert_eq!(between, lookahead);
        assert!(train.is_disjoint(&test));
    }
}

#[test]
fn test_test_windows_are_disjoint_and_walk_backward() {
    let panel = build_panel(250, &["A", "B"], None);
    let cv = MultipleTimeSeriesCV::with_lengths(6, 40, 21, 1).unwrap();
    let splits: Vec<Split> = cv.split_panel(&panel).unwrap().collect();

    for pair in splits.windows(2) {
        let newer = window_dates(&panel, &pair[0].test_positions);
        let older = window_dates(&panel, &pair[1].test_positions);
        assert!(newer.is_disjoint(&older));
        assert!(older.iter().next_back().unwrap() < newer.iter().next().unwrap());
    }
    assert_eq!(splits[0].test_range.end, d(250));
}

#[test]
fn test_every_entity_on_a_window_date_is_included() {
    // Sparse panel: entity C only trades on even days.
    let mut symbols = Vec::new();
    let mut dates = Vec::new();
    for n in 1..=120 {
        for symbol in ["A", "B", "C"] {
            if symbol == "C" && n % 2 == 1 {
                continue;
            }
            symbols.push(symbol.to_string());
            dates.push(d(n));
        }
    }
    let df = df! { "symbol" => symbols, "date" => dates.clone() }.unwrap();
    let panel = Panel::new(df, "symbol", "date").unwrap();

    let cv = MultipleTimeSeriesCV::with_lengths(3, 30, 10, 2).unwrap();
    let mut rows_per_date: HashMap<NaiveDate, usize> = HashMap::new();
    for date in &dates {
        *rows_per_date.entry(*date).or_default() += 1;
    }

    for split in cv.split_panel(&panel).unwrap() {
        for positions in [&split.train_positions, &split.test_positions] {
            let covered = window_dates(&panel, positions);
            let expected: usize = covered.iter().map(|date| rows_per_date[date]).sum();
            assert_eq!(positions.len(), expected);
        }
    }
}

#[test]
fn test_row_order_does_not_change_windows() {
    let ordered = build_panel(150, &["A", "B", "C"], None);
    let shuffled = build_panel(150, &["A", "B", "C"], Some(42));
    let cv = MultipleTimeSeriesCV::with_lengths(3, 50, 15, 3).unwrap();

    let a: Vec<Split> = cv.split_panel(&ordered).unwrap().collect();
    let b: Vec<Split> = cv.split_panel(&shuffled).unwrap().collect();

    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.train_range, y.train_range);
        assert_eq!(x.test_range, y.test_range);
        assert_eq!(
            window_dates(&ordered, &x.test_positions),
            window_dates(&shuffled, &y.test_positions)
        );
        // Positions come back ascending regardless of input order.
        assert!(y.train_positions.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn test_split_is_idempotent() {
    let panel = build_panel(180, &["A", "B"], Some(3));
    let cv = MultipleTimeSeriesCV::with_lengths(4, 60, 21, 1).unwrap();

    let first: Vec<Split> = cv.split_panel(&panel).unwrap().collect();
    let second: Vec<Split> = cv.split_panel(&panel).unwrap().collect();
    assert_eq!(first, second);
}

#[test]
fn test_insufficient_history() {
    let panel = build_panel(100, &["A"], None);
    // 3 * 21 + 40 + 1 = 104 dates needed.
    let cv = MultipleTimeSeriesCV::with_lengths(3, 40, 21, 1).unwrap();

    match cv.split_panel(&panel) {
        Err(PanelCvError::InsufficientHistory { required, available }) => {
            assert_eq!(required, 104);
            assert_eq!(available, 100);
        }
        other => panic!("expected InsufficientHistory, got {:?}", other.map(|s| s.len())),
    }
}
