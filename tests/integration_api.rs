//! Integration tests for the REST API feature.

#![cfg(feature = "api")]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use microgrid_sim::api::{AppState, router};
use microgrid_sim::config::ScenarioConfig;
use microgrid_sim::devices::{Battery, DieselGenerator};
use microgrid_sim::environment::{WeatherGenerator, default_start_time};
use microgrid_sim::sim::fleet::Fleet;

fn empty_state() -> Arc<AppState> {
    Arc::new(AppState::new(
        Fleet::new(),
        WeatherGenerator::new(default_start_time(), 7),
        8,
    ))
}

async fn send(
    state: &Arc<AppState>,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = router(state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn approx(v: &Value, expected: f64) -> bool {
    v.as_f64().is_some_and(|x| (x - expected).abs() < 1e-6)
}

#[tokio::test]
async fn islanded_fleet_built_and_dispatched_over_http() {
    let state = empty_state();

    let (status, _) = send(
        &state,
        "POST",
        "/device",
        Some(json!({"type": "DieselGenerator", "params": {"name": "DG1", "rated_power": 100.0}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(
        &state,
        "POST",
        "/device",
        Some(json!({
            "type": "battery",
            "params": {"name": "BESS1", "capacity_kwh": 1000.0, "max_power_kw": 200.0, "initial_charge": 0.5}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{json}");

    let (status, json) = send(
        &state,
        "POST",
        "/device",
        Some(json!({"type": "DieselGenerator", "params": {"name": "DG1", "rated_power": 50.0}})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("DG1"));

    let (status, _) = send(
        &state,
        "POST",
        "/environment/update",
        Some(json!({"wind_speed": 0.0, "solar_radiation": 0.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(
        &state,
        "POST",
        "/simulate/step",
        Some(json!({"demand_kw": 150.0, "timestep_hours": 1.0})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let r = &json["simulation_results"];
    assert!(approx(&r["diesel_generation_kw"], 100.0));
    assert!(approx(&r["battery_power_kw"], 50.0));
    assert!(approx(&r["unbalanced_kw"], 0.0));
    assert!(json["calculated_demand_kw"].is_null());

    let (_, json) = send(&state, "GET", "/diesel/status", None).await;
    assert_eq!(json["summary"]["running_generators"], 1);
    assert!(approx(&json["summary"]["total_diesel_usage_lph"], 40.0));
    assert_eq!(json["diesel_generators"][0]["manual_setpoint"], "auto");

    let (_, json) = send(&state, "GET", "/grids/status", None).await;
    assert_eq!(json["total_grids"], 0);

    let (_, json) = send(&state, "GET", "/batteries/status", None).await;
    assert_eq!(json["total_batteries"], 1);
    assert!(json["batteries"][0]["state_of_charge_kwh"].as_f64().unwrap() < 500.0);
}

#[tokio::test]
async fn manual_setpoints_drive_the_next_step() {
    let state = empty_state();
    {
        let mut fleet = state.fleet.lock();
        fleet
            .add_device(DieselGenerator::new("DG1", 100.0, 0.3).unwrap())
            .unwrap();
        fleet
            .add_device(Battery::new("BESS1", 1000.0, 200.0, 0.9, 0.5).unwrap())
            .unwrap();
    }

    let (status, json) = send(&state, "POST", "/diesel/DG1/setpoint", Some(json!({"setpoint_kw": 30.0}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["note"].as_str().is_some());

    let (status, json) = send(&state, "POST", "/diesel/strategy?strategy=manual", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["strategy"], "manual");

    let (status, _) = send(&state, "POST", "/diesel/DG1/setpoint", Some(json!({"setpoint_kw": 150.0}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&state, "POST", "/diesel/DG9/setpoint", Some(json!({"setpoint_kw": 10.0}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&state, "POST", "/diesel/strategy?strategy=turbo", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, json) = send(
        &state,
        "POST",
        "/simulate/step",
        Some(json!({"demand_kw": 150.0, "timestep_hours": 1.0})),
    )
    .await;
    let r = &json["simulation_results"];
    assert_eq!(r["diesel_strategy"], "manual");
    assert!(approx(&r["diesel_generation_kw"], 30.0));
    assert!(approx(&r["battery_power_kw"], 120.0));

    let (_, json) = send(&state, "GET", "/diesel/status", None).await;
    assert!(approx(&json["diesel_generators"][0]["manual_setpoint"], 30.0));
}

#[tokio::test]
async fn realistic_step_advances_the_clock() {
    let state = Arc::new(AppState::from_config(&ScenarioConfig::baseline()).unwrap());
    let (_, before) = send(&state, "GET", "/environment", None).await;

    let (status, json) = send(
        &state,
        "POST",
        "/simulate/realistic?total_daily_kwh=1200&timestep_hours=2",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let demand = json["calculated_demand_kw"].as_f64().unwrap();
    assert!(demand > 0.0);
    assert!(approx(&json["simulation_results"]["demand_kw"], demand));
    assert_eq!(json["simulation_results"]["timestamp"], before["timestamp"]);
    assert_ne!(json["environment_state"]["timestamp"], before["timestamp"]);

    let (status, _) = send(&state, "POST", "/simulate/realistic?timestep_hours=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&state, "POST", "/environment/step?hours=30", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn device_removal_and_missing_names() {
    let state = Arc::new(AppState::from_config(&ScenarioConfig::baseline()).unwrap());

    let (status, json) = send(&state, "DELETE", "/device/PV1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["remaining_devices"], 3);

    let (status, json) = send(&state, "DELETE", "/device/PV1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());

    let (status, _) = send(
        &state,
        "POST",
        "/device",
        Some(json!({"type": "fusion_reactor", "params": {"name": "X"}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, json) = send(&state, "GET", "/health", None).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["devices_count"], 3);
}

#[tokio::test]
async fn scenario_analysis_leaves_live_state_alone() {
    let state = Arc::new(AppState::from_config(&ScenarioConfig::baseline()).unwrap());
    let (_, before) = send(&state, "GET", "/environment", None).await;

    let (status, json) = send(&state, "POST", "/analyze/scenario", Some(json!({"duration_days": 2}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["with_renewables"]["steps"], 48);
    assert!(json["savings"]["cost_saved"].is_number());
    assert!(json["savings"]["co2_saving_percent"].is_number());

    let (_, after) = send(&state, "GET", "/environment", None).await;
    assert_eq!(before, after);
    let (_, batteries) = send(&state, "GET", "/batteries/status", None).await;
    assert!(approx(&batteries["total_energy_kwh"], 1600.0));

    let (status, _) = send(
        &state,
        "POST",
        "/analyze/scenario",
        Some(json!({"duration_days": 1, "exclude_device_name": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
