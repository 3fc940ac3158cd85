use super::helpers::run_ranks;
use rankshare::{ReduceOp, same_comm};

#[tokio::test]
async fn test_single_job_keeps_whole_group() {
    run_ranks(4, |ctx| {
        let pair = ctx.split_for_jobs(1).unwrap();
        assert_eq!(pair.group_count, 1);
        assert_eq!(pair.group_index, 0);
        assert!(same_comm(&pair.inner, &ctx.current()));
        assert_eq!(pair.outer.size(), 1);
        assert_eq!(pair.outer.rank(), 0);
    })
    .await;
}

#[tokio::test]
async fn test_one_job_per_rank() {
    run_ranks(4, |ctx| {
        let rank = ctx.current().rank();
        let pair = ctx.split_for_jobs(4).unwrap();
        assert_eq!(pair.group_count, 4);
        assert_eq!(pair.group_index, rank);
        assert!(same_comm(&pair.outer, &ctx.current()));
        assert_eq!(pair.inner.size(), 1);
    })
    .await;
}

#[tokio::test]
async fn test_more_jobs_than_ranks_caps_groups() {
    run_ranks(3, |ctx| {
        let rank = ctx.current().rank();
        let pair = ctx.split_for_jobs(10).unwrap();
        assert_eq!(pair.group_count, 3);
        assert_eq!(pair.group_index, rank);
        assert_eq!(pair.inner.size(), 1);
    })
    .await;
}

#[tokio::test]
async fn test_uneven_split_groups_by_residue() {
    // 5 ranks, 3 jobs: groups {0,3}, {1,4}, {2}; outer rows {0,1,2}, {3,4}.
    let results = run_ranks(5, |ctx| {
        let rank = ctx.current().rank();
        let pair = ctx.split_for_jobs(3).unwrap();
        let inner_members = pair.inner.all_gather_u64(rank as u64).unwrap();
        let outer_members = pair.outer.all_gather_u64(rank as u64).unwrap();
        (pair.group_count, pair.group_index, inner_members, outer_members)
    })
    .await;

    let expected_inner: [&[u64]; 5] = [&[0, 3], &[1, 4], &[2], &[0, 3], &[1, 4]];
    let expected_outer: [&[u64]; 5] = [&[0, 1, 2], &[0, 1, 2], &[0, 1, 2], &[3, 4], &[3, 4]];
    for (rank, (count, index, inner, outer)) in results.into_iter().enumerate() {
        assert_eq!(count, 3, "rank {rank}: group count");
        assert_eq!(index, rank as u32 % 3, "rank {rank}: group index");
        assert_eq!(inner, expected_inner[rank], "rank {rank}: inner members");
        assert_eq!(outer, expected_outer[rank], "rank {rank}: outer members");
    }
}

#[tokio::test]
async fn test_split_groups_reduce_independently() {
    let sums = run_ranks(6, |ctx| {
        let rank = ctx.current().rank();
        let pair = ctx.split_for_jobs(2).unwrap();
        pair.inner.all_reduce(rank as f64, ReduceOp::Sum).unwrap()
    })
    .await;

    // Group 0 holds even ranks, group 1 odd ranks.
    for (rank, sum) in sums.into_iter().enumerate() {
        let expected = if rank % 2 == 0 { 6.0 } else { 9.0 };
        assert_eq!(sum, expected, "rank {rank}");
    }
}

#[tokio::test]
async fn test_resplit_inner_group() {
    // 8 ranks, 2 jobs, then 2 sub-jobs inside each group.
    let results = run_ranks(8, |ctx| {
        let rank = ctx.current().rank();
        let top = ctx.split_for_jobs(2).unwrap();
        ctx.push(top.inner.clone());
        let sub = ctx.split_for_jobs(2).unwrap();
        let members = sub.inner.all_gather_u64(rank as u64).unwrap();
        ctx.pop(Some(&top.inner));
        (top.group_index, sub.group_index, members)
    })
    .await;

    for (rank, (top, sub, members)) in results.into_iter().enumerate() {
        assert_eq!(top, rank as u32 % 2);
        assert_eq!(members.len(), 2, "rank {rank}");
        assert!(members.contains(&(rank as u64)));
        // Members of a sub-group share the top-level group and sub-group.
        for m in members {
            assert_eq!(m % 2, rank as u64 % 2);
            assert_eq!((m / 2) % 2, sub as u64, "rank {rank}");
        }
    }
}
