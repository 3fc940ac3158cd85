use super::helpers::run_ranks;
use rankshare::{ChaChaSource, PhasedRandom, RandomSource};

fn draws(src: &mut impl RandomSource, n: usize) -> Vec<f64> {
    (0..n).map(|_| src.random()).collect()
}

#[tokio::test]
async fn test_sync_random_adopts_root_state() {
    let results = run_ranks(3, |ctx| {
        let mut rng = ChaChaSource::from_seed(100 + ctx.current().rank() as u64);
        ctx.sync_random(&mut rng).unwrap();
        draws(&mut rng, 5)
    })
    .await;

    let expected = draws(&mut ChaChaSource::from_seed(100), 5);
    for (rank, got) in results.into_iter().enumerate() {
        assert_eq!(got, expected, "rank {rank}");
    }
}

#[tokio::test]
async fn test_synced_then_phased_streams_partition_sequence() {
    let p = 4usize;
    let k = 3usize;
    let results = run_ranks(p as u32, move |ctx| {
        let mut base = ChaChaSource::from_seed(ctx.current().rank() as u64);
        ctx.sync_random(&mut base).unwrap();
        let mut phased = PhasedRandom::for_comm(base, &*ctx.current());
        draws(&mut phased, k)
    })
    .await;

    let single = draws(&mut ChaChaSource::from_seed(0), p * k);
    for (rank, got) in results.iter().enumerate() {
        let expected: Vec<f64> = (0..k).map(|n| single[rank + n * p]).collect();
        assert_eq!(got, &expected, "rank {rank}");
    }
}

#[tokio::test]
async fn test_group_members_phase_within_their_group() {
    // 4 ranks, 2 jobs: groups {0,2} and {1,3}. Each group adopts its first
    // member's stream, seeded by the job, and splits it between its members.
    let results = run_ranks(4, |ctx| {
        let jobs = [7u64, 8];
        let mut out = Vec::new();
        for job in ctx.local_share(&jobs).unwrap() {
            let job = *job.unwrap();
            let comm = ctx.current();
            let seed = if comm.is_root() { job } else { 999 };
            let mut base = ChaChaSource::from_seed(seed);
            ctx.sync_random(&mut base).unwrap();
            let mut phased = PhasedRandom::for_comm(base, &*comm);
            out.push((job, comm.rank(), draws(&mut phased, 2)));
        }
        out
    })
    .await;

    for (job, member, got) in results.into_iter().flatten() {
        let single = draws(&mut ChaChaSource::from_seed(job), 4);
        let m = member as usize;
        assert_eq!(got, vec![single[m], single[m + 2]], "job {job} member {member}");
    }
}
