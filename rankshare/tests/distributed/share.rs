use super::helpers::run_ranks;
use rankshare::{ParallelContext, ReduceOp};
use std::collections::BTreeMap;

/// Run a share of `0..jobs` on `world_size` ranks and return, per rank, its
/// group index and the items it visited.
async fn collect_shares(world_size: u32, jobs: u32) -> Vec<(u32, Vec<u32>)> {
    run_ranks(world_size, move |ctx| {
        let items: Vec<u32> = (0..jobs).collect();
        let mut share = ctx.local_share(&items).unwrap();
        let group = share.group_index();
        let mut seen = Vec::new();
        for item in share.by_ref() {
            seen.push(*item.unwrap());
        }
        share.finish().unwrap();
        assert_eq!(ctx.depth(), 1);
        (group, seen)
    })
    .await
}

#[tokio::test]
async fn test_every_item_visited_by_exactly_one_group() {
    let cases = [
        (1, 5),
        (2, 5),
        (3, 3),
        (4, 2),
        (5, 3),
        (4, 7),
        (6, 4),
        (7, 20),
        (3, 0),
    ];
    for (world_size, jobs) in cases {
        let results = collect_shares(world_size, jobs).await;

        let mut by_group: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
        for (rank, (group, seen)) in results.into_iter().enumerate() {
            match by_group.get(&group) {
                Some(existing) => assert_eq!(
                    existing, &seen,
                    "world {world_size}, jobs {jobs}: rank {rank} disagrees with its group"
                ),
                None => {
                    by_group.insert(group, seen);
                }
            }
        }

        let expected_groups = jobs.max(1).min(world_size);
        assert_eq!(by_group.len() as u32, expected_groups);

        let mut all: Vec<u32> = by_group.values().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(
            all,
            (0..jobs).collect::<Vec<_>>(),
            "world {world_size}, jobs {jobs}"
        );
    }
}

#[tokio::test]
async fn test_groups_stripe_items() {
    // 4 ranks, 7 jobs: one rank per group, rank r sees r, r + 4, ...
    let results = collect_shares(4, 7).await;
    let expected: [&[u32]; 4] = [&[0, 4], &[1, 5], &[2, 6], &[3]];
    for (rank, (group, seen)) in results.into_iter().enumerate() {
        assert_eq!(group, rank as u32);
        assert_eq!(seen, expected[rank]);
    }
}

#[tokio::test]
async fn test_body_runs_on_group_communicator() {
    // 6 ranks, 2 jobs: groups of three, each job reduces over its group.
    let results = run_ranks(6, |ctx| {
        let world_rank = ctx.current().rank();
        let items = ["left", "right"];
        let mut out = Vec::new();
        for item in ctx.local_share(&items).unwrap() {
            let item = item.unwrap();
            let comm = ctx.current();
            let members = comm.all_reduce(1.0, ReduceOp::Sum).unwrap();
            let rank_sum = comm.all_reduce(world_rank as f64, ReduceOp::Sum).unwrap();
            out.push((*item, members, rank_sum));
        }
        out
    })
    .await;

    for (rank, out) in results.into_iter().enumerate() {
        let (name, sum) = if rank % 2 == 0 {
            ("left", 6.0)
        } else {
            ("right", 9.0)
        };
        assert_eq!(out, vec![(name, 3.0, sum)], "rank {rank}");
    }
}

#[tokio::test]
async fn test_break_restores_stack_on_every_rank() {
    let depths = run_ranks(4, |ctx| {
        let items: Vec<u32> = (0..8).collect();
        for item in ctx.local_share(&items).unwrap() {
            // Every rank's first item is below 4.
            if *item.unwrap() < 4 {
                break;
            }
        }
        let depth = ctx.depth();
        ctx.current().barrier().unwrap();
        depth
    })
    .await;
    assert_eq!(depths, vec![1; 4]);
}

fn fail_on(ctx: &ParallelContext, items: &[u32], bad: u32) -> Result<Vec<u32>, String> {
    let mut done = Vec::new();
    for item in ctx.local_share(items).map_err(|e| e.to_string())? {
        let item = *item.map_err(|e| e.to_string())?;
        if item == bad {
            return Err(format!("job {item} failed"));
        }
        done.push(item);
    }
    Ok(done)
}

#[tokio::test]
async fn test_early_return_in_one_group_does_not_block_others() {
    // 4 ranks, 6 jobs: one rank per group, stride 4.
    let results = run_ranks(4, |ctx| {
        let items: Vec<u32> = (0..6).collect();
        let outcome = fail_on(&ctx, &items, 1);
        assert_eq!(ctx.depth(), 1);
        // The base communicator is usable afterwards on every rank.
        let total = ctx.current().all_reduce(1.0, ReduceOp::Sum).unwrap();
        (outcome, total)
    })
    .await;

    assert_eq!(results[0], (Ok(vec![0, 4]), 4.0));
    assert_eq!(results[1], (Err("job 1 failed".to_string()), 4.0));
    assert_eq!(results[2], (Ok(vec![2]), 4.0));
    assert_eq!(results[3], (Ok(vec![3]), 4.0));
}

#[tokio::test]
async fn test_early_return_shared_by_group() {
    // 4 ranks, 2 jobs: groups {0,2} and {1,3}; the second group bails.
    let results = run_ranks(4, |ctx| {
        let items = [10u32, 11];
        let outcome = fail_on(&ctx, &items, 11);
        assert_eq!(ctx.depth(), 1);
        ctx.current().barrier().unwrap();
        outcome
    })
    .await;

    assert_eq!(results[0], Ok(vec![10]));
    assert_eq!(results[2], Ok(vec![10]));
    assert_eq!(results[1], Err("job 11 failed".to_string()));
    assert_eq!(results[3], Err("job 11 failed".to_string()));
}

#[tokio::test]
async fn test_nested_shares_cover_cross_product() {
    // 4 ranks, 2 outer jobs: groups of two; each group splits its two ranks
    // across two inner jobs.
    let results = run_ranks(4, |ctx| {
        let outer_items = [0u32, 1];
        let inner_items = [0u32, 1];
        let mut pairs = Vec::new();
        for a in ctx.local_share(&outer_items).unwrap() {
            let a = *a.unwrap();
            assert_eq!(ctx.current().size(), 2);
            for b in ctx.local_share(&inner_items).unwrap() {
                assert_eq!(ctx.depth(), 3);
                assert_eq!(ctx.current().size(), 1);
                pairs.push((a, *b.unwrap()));
            }
            assert_eq!(ctx.depth(), 2);
        }
        assert_eq!(ctx.depth(), 1);
        pairs
    })
    .await;

    let mut all: Vec<(u32, u32)> = results.into_iter().flatten().collect();
    all.sort_unstable();
    assert_eq!(all, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
}

#[tokio::test]
async fn test_finish_reports_success() {
    run_ranks(3, |ctx| {
        let items = [1, 2, 3, 4, 5];
        let mut share = ctx.local_share(&items).unwrap();
        assert!(share.next().is_some());
        // Stop early on every rank; closing still synchronizes.
        share.finish().unwrap();
        assert_eq!(ctx.depth(), 1);
    })
    .await;
}
