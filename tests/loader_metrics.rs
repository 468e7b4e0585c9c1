use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use serial_test::serial;

use spindle::application::loader::{
    CacheKey, ContentLoader, METRIC_CACHE_BYPASS_TOTAL, METRIC_CACHE_HIT_TOTAL,
    METRIC_CACHE_MISS_TOTAL,
};
use spindle::infra::kv::MemoryKvStore;
use spindle::infra::telemetry::describe_metrics;

#[tokio::test]
#[serial]
async fn loader_outcomes_emit_route_labelled_counters() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    describe_metrics();

    let store = Arc::new(MemoryKvStore::new(
        NonZeroUsize::new(8).expect("non-zero capacity"),
    ));
    let loader = ContentLoader::new(store, Duration::from_secs(60));
    let key = CacheKey::Album("A1".into());

    for cacheable in [false, true, true] {
        let value: Result<String, std::convert::Infallible> = loader
            .load(&key, cacheable, || async { Ok("First Light".to_string()) })
            .await;
        assert_eq!(value.as_deref(), Ok("First Light"));
    }

    let counters: HashMap<String, u64> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(key, _, _, value)| match value {
            DebugValue::Counter(count) => {
                let labels: Vec<String> = key
                    .key()
                    .labels()
                    .map(|label| format!("{}={}", label.key(), label.value()))
                    .collect();
                Some((format!("{}{{{}}}", key.key().name(), labels.join(",")), count))
            }
            _ => None,
        })
        .collect();

    for name in [
        METRIC_CACHE_BYPASS_TOTAL,
        METRIC_CACHE_MISS_TOTAL,
        METRIC_CACHE_HIT_TOTAL,
    ] {
        let labelled = format!("{name}{{route=album}}");
        assert_eq!(
            counters.get(&labelled).copied(),
            Some(1),
            "expected one {labelled}, got {counters:?}"
        );
    }
}
