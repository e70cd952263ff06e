//! End-to-end study over CSV exports.

use approx::assert_abs_diff_eq;
use fd_sorts::{
    CsvReturnSource, CsvSignalSource, Period, PortfolioSort, SignalStudy, SortConfig, SortError,
};
use std::path::PathBuf;

fn data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn study(config: SortConfig) -> SignalStudy<CsvSignalSource, CsvReturnSource> {
    SignalStudy::new(
        CsvSignalSource::new(data("signals.csv")),
        CsvReturnSource::new(data("returns.csv")).with_scale(100.0),
        config,
    )
}

#[test]
fn book_to_market_quintiles() {
    let reports = study(SortConfig::default()).run(&["BM"]).unwrap();
    assert_eq!(reports.len(), 1);

    let report = &reports[0];
    assert_eq!(report.signal, "BM");
    assert_eq!(report.groups.len(), 5);

    let expected_mean = [0.2333333333, 0.5, 0.5, 0.8666666667, 0.95];
    let expected_std = [0.2362907813, 0.2645751311, 0.4, 0.2466441431, 0.45];
    for (i, group) in report.groups.iter().enumerate() {
        assert_eq!(group.group, i as i32 + 1);
        assert_eq!(group.n_periods, 3);
        assert_abs_diff_eq!(group.avg_n_firms, 2.0);
        assert_abs_diff_eq!(group.mean_return, expected_mean[i], epsilon = 1e-8);
        assert_abs_diff_eq!(group.std_return.unwrap(), expected_std[i], epsilon = 1e-8);
        assert_eq!(group.first_period, Period::from_yyyymm(202312).unwrap());
        assert_eq!(group.last_period, Period::from_yyyymm(202402).unwrap());
    }

    let spread = report.spread.as_ref().unwrap();
    assert_eq!(spread.n_periods, 3);
    assert_abs_diff_eq!(spread.mean_return, 0.95 - 0.2333333333, epsilon = 1e-8);
}

#[test]
fn date_range_limits_return_periods() {
    let config = SortConfig {
        start: Period::from_yyyymm(202401).ok(),
        end: Period::from_yyyymm(202401).ok(),
        ..SortConfig::default()
    };
    let reports = study(config).run(&["BM"]).unwrap();

    for group in &reports[0].groups {
        assert_eq!(group.n_periods, 1);
        assert!(group.std_return.is_none());
        assert_eq!(group.first_period, group.last_period);
    }
}

#[test]
fn missing_signals_are_not_assigned() {
    let config = SortConfig {
        sign_adjust: true,
        ..SortConfig::default()
    };
    let study = study(config);
    let panel = study.panel(&["AssetGrowth"]).unwrap();
    let assigned = PortfolioSort::with_config(*study.config())
        .assign(&panel, "AssetGrowth")
        .unwrap();

    // 11 return rows per month, one entity never has a signal
    assert_eq!(assigned.height(), 33);
    let port = assigned.column("port").unwrap().i32().unwrap();
    assert_eq!(port.null_count(), 4);

    let reports = study.run(&["AssetGrowth", "BM"]).unwrap();
    assert_eq!(reports.len(), 2);
    let counts: Vec<f64> = reports[0].groups.iter().map(|g| g.avg_n_firms).collect();
    assert_abs_diff_eq!(counts.iter().sum::<f64>(), (10.0 + 9.0 + 10.0) / 3.0, epsilon = 1e-12);
}

#[test]
fn too_many_groups_for_cross_section() {
    let reports = study(SortConfig::with_groups(20)).run(&["BM"]);
    assert!(matches!(
        reports,
        Err(SortError::InsufficientData {
            required: 20,
            available: 10,
            ..
        })
    ));
}

#[test]
fn unknown_signal_column() {
    let reports = study(SortConfig::default()).run(&["Mom12m"]);
    assert!(matches!(reports, Err(SortError::MissingColumn(name)) if name == "Mom12m"));
}
