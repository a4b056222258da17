//! Conflict detection between queues and already-scheduled posts.
//!
//! Two intentionally different checks:
//! - Exact conflicts are hard failures: same post lineage, same
//!   platform, scheduled within one second. Never overridable.
//! - Near conflicts are advisory: any same-platform queue/post pair
//!   within one hour, regardless of lineage. Surfaced for display,
//!   never blocks an operation.

use chrono::{DateTime, Utc};

use evergreen_store::{Conflict, Post, Queue, QueueStatus};

/// Tolerance for exact conflicts, in milliseconds.
pub const EXACT_CONFLICT_TOLERANCE_MS: i64 = 1_000;

/// Window for advisory near conflicts, in milliseconds (1 hour).
pub const NEAR_CONFLICT_WINDOW_MS: i64 = 3_600_000;

/// Whether two posts belong to the same lineage: the same record, a
/// direct clone relationship, or siblings cloned from the same source.
pub fn shares_lineage(a: &Post, b: &Post) -> bool {
    if a.id == b.id {
        return true;
    }
    if a.cloned_from_post_id.as_deref() == Some(b.id.as_str())
        || b.cloned_from_post_id.as_deref() == Some(a.id.as_str())
    {
        return true;
    }
    a.cloned_from_post_id.is_some() && a.cloned_from_post_id == b.cloned_from_post_id
}

fn within(a: DateTime<Utc>, b: DateTime<Utc>, tolerance_ms: i64) -> bool {
    (a.timestamp_millis() - b.timestamp_millis()).abs() <= tolerance_ms
}

/// Find an exact conflict for a queue targeting `source` at
/// `queue_time`, against the owner's already-scheduled posts.
///
/// Only the source's enabled platforms are considered, and only posts
/// in the same lineage can conflict.
pub fn exact_conflict(
    queue_id: &str,
    source: &Post,
    queue_time: DateTime<Utc>,
    scheduled: &[Post],
) -> Option<Conflict> {
    let platforms = source.enabled_platforms();
    for post in scheduled {
        if !shares_lineage(source, post) {
            continue;
        }
        for platform in &platforms {
            let Some(post_time) = post.scheduled_time(*platform) else {
                continue;
            };
            if within(post_time, queue_time, EXACT_CONFLICT_TOLERANCE_MS) {
                return Some(Conflict {
                    queue_id: queue_id.to_string(),
                    post_id: post.id.clone(),
                    queue_time,
                    post_time,
                    platform: *platform,
                });
            }
        }
    }
    None
}

/// Report every advisory collision between an owner's active queues and
/// scheduled posts.
///
/// `queues` pairs each queue with its source post, which determines the
/// platforms the queue will publish to. Lineage is ignored: any
/// same-platform pair within the window is reported.
pub fn near_conflicts(queues: &[(Queue, Post)], scheduled: &[Post]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for (queue, source) in queues {
        if queue.status != QueueStatus::Active {
            continue;
        }
        let platforms = source.enabled_platforms();
        for post in scheduled {
            for platform in &platforms {
                let Some(post_time) = post.scheduled_time(*platform) else {
                    continue;
                };
                if within(post_time, queue.next_due_time, NEAR_CONFLICT_WINDOW_MS) {
                    conflicts.push(Conflict {
                        queue_id: queue.id.clone(),
                        post_id: post.id.clone(),
                        queue_time: queue.next_due_time,
                        post_time,
                        platform: *platform,
                    });
                }
            }
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    use evergreen_store::{Platform, PlatformTarget};

    fn post_with_id(id: &str, platforms: &[Platform]) -> Post {
        let mut targets = BTreeMap::new();
        for platform in platforms {
            targets.insert(*platform, PlatformTarget::with_content("content"));
        }
        let mut post = Post::new("owner", targets);
        post.id = id.to_string();
        post
    }

    fn scheduled_post(
        id: &str,
        cloned_from: Option<&str>,
        platform: Platform,
        at: DateTime<Utc>,
    ) -> Post {
        let mut post = post_with_id(id, &[platform]);
        post.cloned_from_post_id = cloned_from.map(str::to_string);
        post.targets.get_mut(&platform).unwrap().scheduled_time = Some(at);
        post
    }

    fn active_queue(id: &str, source: &str, next_due: DateTime<Utc>) -> Queue {
        Queue::new(
            id.to_string(),
            "owner".to_string(),
            source.to_string(),
            7,
            next_due,
            None,
        )
    }

    #[test]
    fn test_lineage_same_post() {
        let a = post_with_id("p1", &[Platform::Twitter]);
        assert!(shares_lineage(&a, &a));
    }

    #[test]
    fn test_lineage_parent_child() {
        let parent = post_with_id("p1", &[Platform::Twitter]);
        let mut child = post_with_id("c1", &[Platform::Twitter]);
        child.cloned_from_post_id = Some("p1".to_string());

        assert!(shares_lineage(&parent, &child));
        assert!(shares_lineage(&child, &parent));
    }

    #[test]
    fn test_lineage_siblings() {
        let mut a = post_with_id("c1", &[Platform::Twitter]);
        let mut b = post_with_id("c2", &[Platform::Twitter]);
        a.cloned_from_post_id = Some("p1".to_string());
        b.cloned_from_post_id = Some("p1".to_string());

        assert!(shares_lineage(&a, &b));
    }

    #[test]
    fn test_lineage_unrelated() {
        let a = post_with_id("p1", &[Platform::Twitter]);
        let b = post_with_id("p2", &[Platform::Twitter]);
        assert!(!shares_lineage(&a, &b));

        // Two originals are not siblings just because neither is a clone.
        let mut c = post_with_id("c1", &[Platform::Twitter]);
        c.cloned_from_post_id = Some("p9".to_string());
        assert!(!shares_lineage(&a, &c));
    }

    #[test]
    fn test_exact_conflict_within_tolerance() {
        let now = Utc::now();
        let source = post_with_id("p1", &[Platform::Linkedin]);
        let clone = scheduled_post(
            "c1",
            Some("p1"),
            Platform::Linkedin,
            now + Duration::milliseconds(500),
        );

        let conflict = exact_conflict("q1", &source, now, &[clone]).unwrap();
        assert_eq!(conflict.post_id, "c1");
        assert_eq!(conflict.platform, Platform::Linkedin);
        assert_eq!(conflict.queue_id, "q1");
    }

    #[test]
    fn test_exact_conflict_outside_tolerance() {
        let now = Utc::now();
        let source = post_with_id("p1", &[Platform::Linkedin]);
        let clone = scheduled_post(
            "c1",
            Some("p1"),
            Platform::Linkedin,
            now + Duration::milliseconds(1_001),
        );

        assert!(exact_conflict("q1", &source, now, &[clone]).is_none());
    }

    #[test]
    fn test_exact_conflict_requires_same_platform() {
        let now = Utc::now();
        let source = post_with_id("p1", &[Platform::Twitter]);
        let clone = scheduled_post("c1", Some("p1"), Platform::Linkedin, now);

        // Same lineage, same time, different platform: no conflict.
        assert!(exact_conflict("q1", &source, now, &[clone]).is_none());
    }

    #[test]
    fn test_exact_conflict_requires_lineage() {
        let now = Utc::now();
        let source = post_with_id("p1", &[Platform::Twitter]);
        let other = scheduled_post("x1", None, Platform::Twitter, now);

        assert!(exact_conflict("q1", &source, now, &[other]).is_none());
    }

    #[test]
    fn test_near_conflict_ignores_lineage() {
        let now = Utc::now();
        let source = post_with_id("p1", &[Platform::Twitter]);
        let queue = active_queue("q1", "p1", now);
        let unrelated = scheduled_post("x1", None, Platform::Twitter, now + Duration::minutes(30));

        let conflicts = near_conflicts(&[(queue, source)], &[unrelated]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].post_id, "x1");
    }

    #[test]
    fn test_near_conflict_window_boundary() {
        let now = Utc::now();
        let source = post_with_id("p1", &[Platform::Twitter]);
        let queue = active_queue("q1", "p1", now);

        let at_edge = scheduled_post("x1", None, Platform::Twitter, now + Duration::hours(1));
        let past_edge = scheduled_post(
            "x2",
            None,
            Platform::Twitter,
            now + Duration::hours(1) + Duration::milliseconds(1),
        );

        let conflicts = near_conflicts(&[(queue, source)], &[at_edge, past_edge]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].post_id, "x1");
    }

    #[test]
    fn test_near_conflict_skips_inactive_queues() {
        let now = Utc::now();
        let source = post_with_id("p1", &[Platform::Twitter]);
        let mut queue = active_queue("q1", "p1", now);
        queue.status = QueueStatus::Paused;
        let post = scheduled_post("x1", None, Platform::Twitter, now);

        assert!(near_conflicts(&[(queue, source)], &[post]).is_empty());
    }

    #[test]
    fn test_near_conflict_requires_same_platform() {
        let now = Utc::now();
        let source = post_with_id("p1", &[Platform::Twitter]);
        let queue = active_queue("q1", "p1", now);
        let post = scheduled_post("x1", None, Platform::Facebook, now);

        assert!(near_conflicts(&[(queue, source)], &[post]).is_empty());
    }

    proptest! {
        // Exact detection is symmetric in time: a collision at +d is a
        // collision at -d.
        #[test]
        fn exact_conflict_symmetric(offset_ms in 0i64..5_000) {
            let now = Utc::now();
            let source = post_with_id("p1", &[Platform::Twitter]);
            let ahead = scheduled_post(
                "c1",
                Some("p1"),
                Platform::Twitter,
                now + Duration::milliseconds(offset_ms),
            );
            let behind = scheduled_post(
                "c1",
                Some("p1"),
                Platform::Twitter,
                now - Duration::milliseconds(offset_ms),
            );

            let hit_ahead = exact_conflict("q1", &source, now, &[ahead]).is_some();
            let hit_behind = exact_conflict("q1", &source, now, &[behind]).is_some();

            prop_assert_eq!(hit_ahead, hit_behind);
            prop_assert_eq!(hit_ahead, offset_ms <= EXACT_CONFLICT_TOLERANCE_MS);
        }

        // Near conflicts are reported exactly inside the window.
        #[test]
        fn near_conflict_matches_window(offset_ms in -7_200_000i64..7_200_000) {
            let now = Utc::now();
            let source = post_with_id("p1", &[Platform::Twitter]);
            let queue = active_queue("q1", "p1", now);
            let post = scheduled_post(
                "x1",
                None,
                Platform::Twitter,
                now + Duration::milliseconds(offset_ms),
            );

            let hits = near_conflicts(&[(queue, source)], &[post]);
            prop_assert_eq!(!hits.is_empty(), offset_ms.abs() <= NEAR_CONFLICT_WINDOW_MS);
        }

        // Every exact conflict is also a near conflict: the hard check
        // is strictly tighter than the advisory one.
        #[test]
        fn exact_implies_near(offset_ms in -1_000i64..1_000) {
            let now = Utc::now();
            let source = post_with_id("p1", &[Platform::Twitter]);
            let queue = active_queue("q1", "p1", now);
            let post = scheduled_post(
                "c1",
                Some("p1"),
                Platform::Twitter,
                now + Duration::milliseconds(offset_ms),
            );

            if exact_conflict("q1", &source, now, std::slice::from_ref(&post)).is_some() {
                let near = near_conflicts(&[(queue, source)], &[post]);
                prop_assert!(!near.is_empty());
            }
        }
    }
}
