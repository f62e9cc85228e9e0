//! Integration tests for the scheduler.
//!
//! These tests load the sample configuration shipped in `config/` and run
//! full scheduling cycles against it.

use framework::parser::parse_pods;
use framework::{LlmRequest, Pod, SchedulingContext};
use plugins::{FirstPicker, SchedulerConfig};
use scheduler::{Scheduler, SchedulerProfile};
use std::path::Path;
use std::sync::Arc;
use std::thread;

const SAMPLE_CONFIG: &str = include_str!("../../../config/scheduler.json");
const SAMPLE_PODS: &str = include_str!("../../../config/pods.json");

fn sample_pods() -> Vec<Pod> {
    parse_pods(SAMPLE_PODS).unwrap()
}

#[test]
fn test_load_sample_config_from_disk() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/scheduler.json");
    let scheduler = Scheduler::load(&path).unwrap();

    let profile = scheduler.profile();
    assert_eq!(profile.filter().map(|f| f.name()), Some("low-latency"));
    assert_eq!(profile.picker().map(|p| p.name()), Some("picker"));
    assert_eq!(profile.registry().len(), 6);
}

#[test]
fn test_sample_config_picks_a_candidate() {
    let config = SchedulerConfig::from_json_str(SAMPLE_CONFIG).unwrap();
    let scheduler = Scheduler::from_config(&config).unwrap();
    let pods = sample_pods();

    let result = scheduler
        .schedule(
            &SchedulingContext::new(),
            &LlmRequest::new("r-1", "tweet-lora"),
            &pods,
        )
        .unwrap();

    let target = result.target.expect("a pod should be picked");
    assert_eq!(target.name(), "vllm-2");
    assert!(result.candidates.contains(&target));
}

#[test]
fn test_no_surviving_pods_means_no_target() {
    let config = SchedulerConfig::from_json_str(SAMPLE_CONFIG).unwrap();
    let scheduler = Scheduler::from_config(&config).unwrap();

    let result = scheduler
        .schedule(&SchedulingContext::new(), &LlmRequest::new("r-1", "sql-lora"), &[])
        .unwrap();

    assert!(result.candidates.is_empty());
    assert!(result.target.is_none());
}

#[test]
fn test_profile_without_filter_keeps_every_pod() {
    let scheduler = Scheduler::new(SchedulerProfile::new(
        None,
        Some(Arc::new(FirstPicker::new("first"))),
    ));
    let pods = sample_pods();

    let result = scheduler
        .schedule(&SchedulingContext::new(), &LlmRequest::new("r-1", "llama"), &pods)
        .unwrap();

    assert_eq!(result.candidates, pods);
    assert_eq!(result.target.as_ref().map(Pod::name), Some("vllm-0"));
}

#[test]
fn test_unknown_profile_reference_fails_to_load() {
    let mut config = SchedulerConfig::from_json_str(SAMPLE_CONFIG).unwrap();
    config.scheduling_profile.picker = Some("low-queue".to_string());

    let err = Scheduler::from_config(&config).err().expect("low-queue is not a picker");
    assert!(format!("{err:#}").contains("low-queue is not a picker"));
}

#[test]
fn test_reload_while_scheduling() {
    let config = SchedulerConfig::from_json_str(SAMPLE_CONFIG).unwrap();
    let scheduler = Scheduler::from_config(&config).unwrap();
    let pods = sample_pods();

    thread::scope(|scope| {
        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let scheduler = &scheduler;
                let pods = &pods;
                scope.spawn(move || {
                    for i in 0..100 {
                        let request = LlmRequest::new(format!("w{worker}-{i}"), "sql-lora");
                        let result = scheduler
                            .schedule(&SchedulingContext::new(), &request, pods)
                            .unwrap();
                        assert_eq!(result.target.as_ref().map(Pod::name), Some("vllm-0"));
                    }
                })
            })
            .collect();

        for _ in 0..10 {
            scheduler.reload(&config).unwrap();
        }
        for worker in workers {
            worker.join().unwrap();
        }
    });
}
