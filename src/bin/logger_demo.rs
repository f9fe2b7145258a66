use sessionkeeper::logger::*;

fn main() -> anyhow::Result<()> {
    let logger = Logger::install();
    trace!("bootstrap trace log");
    debug!("bootstrap debug log");
    info!(filter = ?logger.current_filter(), "bootstrap info log");

    logger.set_filter("sessionkeeper=trace,warn")?;
    trace!("application trace log");
    debug!("application debug log");
    warn!(filter = ?logger.current_filter(), "application warn log");

    if let Err(e) = logger.set_filter("sessionkeeper=loudest") {
        println!("rejected: {:#}", e);
    }
    trace!("previous filter still active");

    Ok(())
}
