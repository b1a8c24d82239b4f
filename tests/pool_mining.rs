//! Pool job in, submit request out

use panthera::algorithm::{meets_target, StepOutcome};
use panthera::pool::{decode_target, PoolClient, PoolMessage, ShareStats};
use panthera::{
    Driver, DriverSet, MinerConfig, MiningEngine, PoolJob, ShareLimit, StopReason, SubmitParams,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

const SCENARIO_DIGEST: &str = "16f55ed820f8684f550eac372c6003e4ca2d045f3d243e670bde233369e44a05";

fn scenario_job_json() -> String {
    format!(
        r#"{{"job_id":"pool-1","blob":"{}","target":"{}ffffff0f","height":42,"difficulty":1000}}"#,
        "00".repeat(84),
        "ff".repeat(28)
    )
}

fn scenario_job() -> PoolJob {
    PoolJob::from_json(&scenario_job_json()).unwrap()
}

#[test]
fn test_pool_job_to_submit_request() {
    let job = scenario_job().decode().unwrap();
    let mut engine = MiningEngine::initialized().unwrap();
    job.apply(&mut engine).unwrap();
    assert_eq!(engine.height(), 42);

    engine.start();
    assert_eq!(engine.step(1_000), StepOutcome::Found(6));

    let share = engine.last_share().unwrap();
    assert!(meets_target(&share.digest, &job.target));

    let request = SubmitParams::from_share("rig-1", share).to_request(3);
    assert_eq!(request["params"]["id"], "rig-1");
    assert_eq!(request["params"]["job_id"], "pool-1");
    assert_eq!(request["params"]["nonce"], "00000006");
    assert_eq!(request["params"]["result"], SCENARIO_DIGEST);
}

#[test]
fn test_compact_target_matches_full_form() {
    let full = decode_target(&format!("{}ffffff0f", "ff".repeat(28))).unwrap();
    let compact = decode_target("ffffff0f").unwrap();
    assert_eq!(full, compact);
}

#[tokio::test]
async fn test_driver_mines_pool_job() {
    let job = scenario_job().decode().unwrap();
    let mut engine = MiningEngine::initialized().unwrap();
    job.apply(&mut engine).unwrap();

    let config = MinerConfig {
        intensity: 100,
        step_budget: 100,
        step_interval_ms: 1,
        max_shares: Some(1),
        ..MinerConfig::default()
    };
    let mut driver = Driver::new(engine, config);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let report = driver.run(std::future::pending(), tx).await;
    assert_eq!(report.reason, StopReason::MaxShares);
    assert_eq!(report.hashes, 7);

    let share = rx.recv().await.unwrap();
    assert_eq!(share.job_id, "pool-1");
    assert_eq!(share.nonce, 6);
    assert_eq!(hex::encode(share.digest), SCENARIO_DIGEST);
}

#[tokio::test]
async fn test_pool_session_mines_and_submits() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let pool = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        let login: serde_json::Value =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(login["method"], "login");
        let reply = format!(
            "{{\"id\":{},\"error\":null,\"result\":{{\"id\":\"sess-9\",\"job\":{},\"status\":\"OK\"}}}}\n",
            login["id"],
            scenario_job_json()
        );
        writer.write_all(reply.as_bytes()).await.unwrap();

        let submit: serde_json::Value =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        let reply = format!("{{\"id\":{},\"result\":{{\"status\":\"OK\"}}}}\n", submit["id"]);
        writer.write_all(reply.as_bytes()).await.unwrap();
        submit
    });

    let mut client = PoolClient::connect(&address).await.unwrap();
    client.login("wallet", "rig-1").await.unwrap();
    let job = client.wait_for_job().await.unwrap().decode().unwrap();

    let config = MinerConfig {
        intensity: 100,
        step_budget: 100,
        step_interval_ms: 1,
        max_shares: Some(1),
        ..MinerConfig::default()
    };
    let (tx, mut rx) = mpsc::unbounded_channel();
    let drivers = DriverSet::spawn(&config, Some(&job), None, tx).unwrap();

    let mut limit = ShareLimit::new(config.max_shares);
    let share = rx.recv().await.unwrap();
    client.submit(&share).await.unwrap();
    assert!(limit.record());
    let reports = drivers.join().await.unwrap();
    assert_eq!(reports.len(), 1);

    assert_eq!(
        client.next_message().await.unwrap(),
        Some(PoolMessage::Accepted { id: Some(2) })
    );
    assert_eq!(
        client.stats(),
        ShareStats {
            submitted: 1,
            accepted: 1,
            rejected: 0
        }
    );

    let submit = pool.await.unwrap();
    assert_eq!(submit["params"]["id"], "sess-9");
    assert_eq!(submit["params"]["job_id"], "pool-1");
    assert_eq!(submit["params"]["nonce"], "00000006");
    assert_eq!(submit["params"]["result"], SCENARIO_DIGEST);
}
