use {super::*, solominer::create_backend, std::time::Instant};

const SHARE_DIFFICULTY: f64 = 0.00001;

async fn mining(pool: &MockPool, miner: &Miner, job: &Notify) -> PoolConnection {
    let mut connection = pool.accept().await;
    connection.handshake().await;
    connection.set_difficulty(SHARE_DIFFICULTY).await;
    connection.notify(job).await;

    let mut states = miner.states();
    timeout(WAIT, states.wait_for(|state| state.is_ready()))
        .await
        .unwrap()
        .unwrap();

    connection
}

#[tokio::test]
async fn submitted_shares_meet_the_pool_target() {
    let pool = MockPool::bind().await;
    let settings = Settings {
        backend: BackendKind::Parallel,
        threads: Some(2),
        ..settings(pool.port)
    };
    let backend = create_backend(settings.backend, settings.threads());
    let miner = Miner::start(settings, backend, CancellationToken::new());

    let job = notify("f00d", true, MAINNET_BITS);
    let mut connection = mining(&pool, &miner, &job).await;

    let target = Difficulty::from(SHARE_DIFFICULTY).to_target();

    for _ in 0..3 {
        let request = connection.request("mining.submit").await;
        let submit = serde_json::from_value::<Submit>(request["params"].clone()).unwrap();

        pretty_assert_eq!(submit.username, "bcrt1qexample.rig");
        pretty_assert_eq!(submit.job_id.as_str(), "f00d");
        pretty_assert_eq!(submit.ntime, job.ntime);
        pretty_assert_eq!(submit.extranonce2.len(), 4);
        assert!(target.is_met_by(share_header(&job, &submit).block_hash()));

        connection.reply(&request, json!(true)).await;
    }

    let stats = miner.stop().await;

    assert!(stats.submitted >= 3);
    assert!(stats.hashes > 0);
    pretty_assert_eq!(stats.invalid, 0);
    pretty_assert_eq!(stats.blocks, 0);
    assert!(stats.best_share >= SHARE_DIFFICULTY);
}

#[tokio::test]
async fn events_follow_the_session() {
    let pool = MockPool::bind().await;
    let settings = settings(pool.port);
    let backend = create_backend(settings.backend, 1);
    let miner = Miner::start(settings, backend, CancellationToken::new());
    let mut events = miner.subscribe();

    let job = notify("beef", true, MAINNET_BITS);
    let mut connection = mining(&pool, &miner, &job).await;

    let request = connection.request("mining.submit").await;
    connection.reject(&request, 21, "Job not found").await;

    let mut seen_ready = false;
    let mut seen_job = false;
    let mut seen_submit = false;

    let reason = timeout(WAIT, async {
        loop {
            let Ok(event) = events.recv().await else {
                continue;
            };

            match event {
                MinerEvent::StateChanged(ConnectionState::Ready) => seen_ready = true,
                MinerEvent::JobReceived { job_id, clean } => {
                    pretty_assert_eq!(job_id.as_str(), "beef");
                    assert!(clean);
                    seen_job = true;
                }
                MinerEvent::ShareSubmitted { job_id, .. } => {
                    pretty_assert_eq!(job_id.as_str(), "beef");
                    seen_submit = true;
                }
                MinerEvent::ShareRejected { reason, .. } => return reason,
                _ => {}
            }
        }
    })
    .await
    .unwrap();

    assert!(seen_ready && seen_job && seen_submit);
    assert!(reason.contains("Job not found"));

    let stats = miner.stop().await;
    assert!(stats.rejected >= 1);
}

#[tokio::test]
async fn stop_is_prompt_while_hashing() {
    let pool = MockPool::bind().await;
    let settings = Settings {
        batch_size: Some(1 << 18),
        ..settings(pool.port)
    };
    let backend = create_backend(settings.backend, 1);
    let miner = Miner::start(settings, backend, CancellationToken::new());

    let _connection = mining(&pool, &miner, &notify("cafe", true, MAINNET_BITS)).await;

    let start = Instant::now();
    let stats = miner.stop().await;

    assert!(start.elapsed() < Duration::from_secs(2));
    pretty_assert_eq!(stats.blocks, 0);
}

#[tokio::test]
async fn parent_cancellation_stops_the_miner() {
    let pool = MockPool::bind().await;
    let settings = settings(pool.port);
    let backend = create_backend(settings.backend, 1);
    let cancel = CancellationToken::new();
    let miner = Miner::start(settings, backend, cancel.clone());

    let mut connection = mining(&pool, &miner, &notify("d00d", true, MAINNET_BITS)).await;

    cancel.cancel();

    connection.closed().await;

    let mut states = miner.states();
    timeout(
        WAIT,
        states.wait_for(|state| *state == ConnectionState::Disconnected),
    )
    .await
    .unwrap()
    .unwrap();

    miner.stop().await;
}

#[tokio::test]
async fn refused_worker_stops_mining() {
    let pool = MockPool::bind().await;
    let settings = settings(pool.port);
    let backend = create_backend(settings.backend, 1);
    let miner = Miner::start(settings, backend, CancellationToken::new());

    let mut connection = pool.accept().await;

    let subscribe = connection.request("mining.subscribe").await;
    connection
        .reply(&subscribe, json!([[["mining.notify", "1"]], EXTRANONCE1, 4]))
        .await;

    let authorize = connection.request("mining.authorize").await;
    connection.reject(&authorize, 24, "Unauthorized worker").await;

    let mut states = miner.states();
    timeout(WAIT, states.wait_for(|state| state.is_terminal()))
        .await
        .unwrap()
        .unwrap();

    pretty_assert_eq!(miner.state(), ConnectionState::Unauthorized);

    let stats = miner.stop().await;
    pretty_assert_eq!(stats.hashes, 0);
}
