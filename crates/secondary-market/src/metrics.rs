use {
    crate::error::MarketError,
    model::order::ReplayScheme,
    prometheus::{IntCounterVec, IntGaugeVec},
};

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "secondary_market")]
pub(crate) struct Metrics {
    /// Settled swap orders by replay protection scheme.
    #[metric(labels("scheme"))]
    swaps: IntCounterVec,

    /// Cancelled orders.
    #[metric(labels("scheme"))]
    cancellations: IntCounterVec,

    /// Rejected market calls.
    /// Labels: operation=execute_swap|cancel_order, category=input|authorization|state|transfer
    #[metric(labels("operation", "category", "reason"))]
    rejections: IntCounterVec,

    /// Whether a settlement is currently in progress per market.
    #[metric(labels("market"))]
    settling: IntGaugeVec,
}

impl Metrics {
    pub(crate) fn get() -> &'static Self {
        Metrics::instance(observe::metrics::get_storage_registry()).unwrap()
    }

    pub(crate) fn swap(scheme: ReplayScheme) {
        Self::get()
            .swaps
            .with_label_values(&[scheme.to_string().as_str()])
            .inc();
    }

    pub(crate) fn cancellation(scheme: ReplayScheme) {
        Self::get()
            .cancellations
            .with_label_values(&[scheme.to_string().as_str()])
            .inc();
    }

    pub(crate) fn rejection(operation: &str, err: &MarketError) {
        let category = format!("{:?}", err.category()).to_lowercase();
        Self::get()
            .rejections
            .with_label_values(&[operation, category.as_str(), err.label()])
            .inc();
    }

    pub(crate) fn settling(market: &str, active: bool) {
        Self::get()
            .settling
            .with_label_values(&[market])
            .set(i64::from(active));
    }
}
