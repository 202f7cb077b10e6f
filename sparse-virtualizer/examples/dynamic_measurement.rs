// Example: variable item sizes, measurement, and scroll snapshots.
use sparse_virtualizer::{Align, Viewport, ViewportOptions};

fn main() -> Result<(), sparse_virtualizer::ConfigError> {
    let mut v = Viewport::new(
        ViewportOptions::variable(100, |i| if i % 5 == 0 { 32 } else { 18 })
            .with_container_size(120)
            .with_overscan(2),
    )?;
    v.set_scroll_position(200.0);
    println!(
        "before: off={} total={} range={:?}",
        v.scroll_position(),
        v.state().actual_size,
        v.visible_range()
    );

    // A measured size replaces the estimate in the prefix sums.
    let delta = v.measure(3, 60);
    println!(
        "measure(3): delta={delta} total={} range={:?}",
        v.state().actual_size,
        v.visible_range()
    );

    let snapshot = v.scroll_snapshot();
    println!("snapshot: {snapshot:?}");

    let to = v.scroll_to_index(42, Align::Center);
    println!("scroll_to_index(42, Center): off={to} range={:?}", v.visible_range());

    let restored = v.restore_scroll(&snapshot);
    println!("restore_scroll: off={restored} range={:?}", v.visible_range());
    Ok(())
}
