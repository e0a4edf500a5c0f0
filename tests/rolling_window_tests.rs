use ma_health_forecast::indicator::{window_stats, RollingWindow, Window};

#[test]
fn rolling_mean_and_range() {
    let mut w = RollingWindow::new(Window::Rolling(3), 3);
    assert_eq!(w.push(Some(1.0)), None);
    assert_eq!(w.push(Some(2.0)), None);
    assert!(!w.is_ready());

    let s = w.push(Some(3.0)).unwrap();
    assert!((s.mean - 2.0).abs() < f64::EPSILON);

    let s = w.push(Some(4.0)).unwrap();
    assert!((s.mean - 3.0).abs() < f64::EPSILON);
    assert!((s.min - 2.0).abs() < f64::EPSILON);
    assert!((s.max - 4.0).abs() < f64::EPSILON);
}

#[test]
fn missing_values_occupy_rolling_slots() {
    let mut w = RollingWindow::new(Window::Rolling(3), 2);
    w.push(Some(10.0));
    w.push(None);
    let s = w.push(Some(20.0)).unwrap();
    assert_eq!(s.count, 2);
    assert!((s.mean - 15.0).abs() < f64::EPSILON);

    // [None, 20, None]: one defined value left.
    assert!(w.push(None).is_none());
}

#[test]
fn expanding_window_keeps_everything() {
    let stats = window_stats(
        &[Some(5.0), Some(1.0), Some(9.0), Some(3.0)],
        Window::Expanding,
        2,
    );
    assert!(stats[0].is_none());
    let last = stats[3].unwrap();
    assert_eq!(last.count, 4);
    assert!((last.min - 1.0).abs() < f64::EPSILON);
    assert!((last.max - 9.0).abs() < f64::EPSILON);
    assert!((last.mean - 4.5).abs() < f64::EPSILON);
}

#[test]
fn non_finite_inputs_are_ignored() {
    let stats = window_stats(&[Some(1.0), Some(f64::NAN), Some(3.0)], Window::Expanding, 1);
    let last = stats[2].unwrap();
    assert_eq!(last.count, 2);
    assert!((last.mean - 2.0).abs() < f64::EPSILON);
}

#[test]
fn no_drift_after_many_pushes() {
    let mut w = RollingWindow::new(Window::Rolling(10), 10);
    let mut naive_buf: Vec<f64> = Vec::new();

    for i in 0..5_000u64 {
        let val = (i as f64) * 0.1 + 0.01;
        let stats = w.push(Some(val));
        naive_buf.push(val);
        if naive_buf.len() > 10 {
            naive_buf.remove(0);
        }

        if let Some(s) = stats {
            let naive_avg: f64 = naive_buf.iter().sum::<f64>() / naive_buf.len() as f64;
            assert!(
                (s.mean - naive_avg).abs() < 1e-8,
                "Drift at i={}: window={} naive={}",
                i,
                s.mean,
                naive_avg
            );
        }
    }
}

#[test]
#[should_panic(expected = "rolling window length must be > 0")]
fn zero_length_window_panics() {
    let _ = RollingWindow::new(Window::Rolling(0), 1);
}
