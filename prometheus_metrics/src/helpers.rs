use prometheus::{Histogram, HistogramTimer, HistogramVec};
use tracing::warn;

pub fn start_timer_vec(histogram_vec: &HistogramVec, labels: &[&str]) -> Option<HistogramTimer> {
    histogram_vec
        .get_metric_with_label_values(labels)
        .as_ref()
        .map(Histogram::start_timer)
        .inspect_err(|error| {
            warn!("unable to start timer for {labels:?} in {histogram_vec:?}: {error}");
        })
        .ok()
}

pub fn stop_and_record(timer: Option<HistogramTimer>) {
    if let Some(timer) = timer {
        timer.stop_and_record();
    }
}

pub fn stop_and_discard(timer: Option<HistogramTimer>) {
    if let Some(timer) = timer {
        timer.stop_and_discard();
    }
}
