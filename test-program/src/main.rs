use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let registry = tracing_subscriber::Registry::default().with(
        EnvFilter::builder()
            .with_default_directive(tracing::Level::TRACE.into())
            .from_env()
            .unwrap(),
    );

    let tree_layer = tracing_tree::HierarchicalLayer::new(2)
        .with_targets(true)
        .with_bracketed_fields(true);

    registry.with(tree_layer).init();

    outer();
}

#[inline(never)]
fn outer() {
    middle();
}

#[inline(never)]
fn middle() {
    inner();
}

#[inline(never)]
fn inner() {
    fpwalk::with_current(|stack| {
        println!("backtrace: {}", stack.ips());

        for frame in stack.frames() {
            println!("  fp={:p} ip={:p}", frame.fp, frame.ip);
        }
    });
}
