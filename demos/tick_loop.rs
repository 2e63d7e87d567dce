//! Simulates a controller driving the autoscaler through a handful of
//! evaluation ticks against a synthetic replica set and request load.
//!
//! Run with: cargo run --example tick_loop

use replica_autoscaler::{
    AutoscalerBuilder, AutoscalerDecision, RequestBatch, ReplicaId, ReplicaInfo, ReplicaStatus,
    ServiceSpec,
};

#[tokio::main]
async fn main() -> replica_autoscaler::Result<()> {
    tracing_subscriber::fmt::init();

    let spec = ServiceSpec::fixed(2)
        .with_bounds(1, 8)
        .with_thresholds(Some(5.0), Some(1.0));

    let engine = AutoscalerBuilder::new(spec).with_cooldown(0).build()?;

    let mut replicas: Vec<ReplicaInfo> = (1..=2)
        .map(|id| ReplicaInfo::new(id as u64, ReplicaStatus::Ready).with_alive(true))
        .collect();
    let mut next_id: u64 = replicas.len() as u64 + 1;
    let mut now = 0.0_f64;

    // A request-rate ramp: load climbs, then falls back off.
    let load_schedule = [2.0, 2.0, 20.0, 20.0, 20.0, 1.0, 1.0];

    for (tick, &rps) in load_schedule.iter().enumerate() {
        now += 60.0;
        let timestamps: Vec<f64> = (0..(rps as u64 * 60)).map(|_| now - 1.0).collect();
        engine.ingest_request_info(RequestBatch::new(timestamps), now).await;

        let decisions = engine.evaluate(&replicas, now).await;
        println!("tick {tick} (n={}, rps={rps}): {decisions:?}", replicas.len());

        for decision in decisions {
            match decision {
                AutoscalerDecision::ScaleUp { count, .. } => {
                    for _ in 0..count {
                        replicas.push(
                            ReplicaInfo::new(next_id, ReplicaStatus::Ready).with_alive(true),
                        );
                        next_id += 1;
                    }
                }
                AutoscalerDecision::ScaleDown { replica_ids } => {
                    replicas.retain(|r| !replica_ids.contains(&r.replica_id));
                }
            }
        }
    }

    println!(
        "final replica set: {:?}",
        replicas.iter().map(|r| r.replica_id).collect::<Vec<ReplicaId>>()
    );
    Ok(())
}
