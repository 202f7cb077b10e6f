// Example: a million fixed-size rows behind a compressed native scroll range.
use sparse_virtualizer::{Align, Viewport, ViewportOptions};

fn main() -> Result<(), sparse_virtualizer::ConfigError> {
    let mut v = Viewport::new(ViewportOptions::fixed(1_000_000, 40).with_container_size(600))?;
    let state = v.state();
    println!(
        "actual_size={} total_size={} ratio={:.4}",
        state.actual_size, state.total_size, state.compression_ratio
    );

    let native = v.scroll_to_index(500_000, Align::Start);
    println!("scroll_to_index(500_000): native={native:.1} range={:?}", v.render_range());

    if let Some(render) = v.render_range() {
        for index in render.iter().take(3) {
            println!("  item {index} placed at {:.1}", v.item_position(index));
        }
    }

    // The last rows stay reachable at the bottom of the native range.
    let max = v.max_scroll_position();
    v.set_scroll_position(max);
    println!("bottom: native={max:.1} visible={:?}", v.visible_range());
    Ok(())
}
