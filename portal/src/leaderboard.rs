//! Points, ranking and badges.
//!
//! Points are derived from attendance and never stored: every attendance
//! record (present or late) earns the points of its event's category.

use crate::stats::percent;
use crate::types::{PortalState, RollNumber};
use serde::Serialize;
use std::collections::BTreeMap;

/// Default size of the leaderboard.
pub const DEFAULT_TOP: usize = 10;

/// One ranked student.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based rank
    pub rank: usize,
    /// Student
    pub roll_number: RollNumber,
    /// Name as written on the attendance records
    pub student_name: String,
    /// Total points
    pub points: u32,
    /// Attended events
    pub events_attended: usize,
}

/// Aggregate figures over the leaderboard.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LeaderboardStats {
    /// Students with at least one attendance
    pub total_students: usize,
    /// Sum of all points
    pub total_points: u64,
    /// Rounded mean
    pub average_points: u32,
    /// Best score
    pub highest_points: u32,
    /// Worst score
    pub lowest_points: u32,
}

/// Students ordered by points (descending), ties by roll number.
#[derive(Clone, Debug, Default)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    /// Rank every student that attended at least one event.
    #[must_use]
    pub fn from_state(state: &PortalState) -> Self {
        let mut totals: BTreeMap<&RollNumber, (String, u32, usize)> = BTreeMap::new();

        for event in state.events.values() {
            let points = event.details.category.points();
            for record in &event.attendance {
                let entry = totals
                    .entry(&record.roll_number)
                    .or_insert_with(|| (String::new(), 0, 0));
                entry.0.clone_from(&record.student_name);
                entry.1 += points;
                entry.2 += 1;
            }
        }

        let mut entries: Vec<LeaderboardEntry> = totals
            .into_iter()
            .map(|(roll, (name, points, attended))| LeaderboardEntry {
                rank: 0,
                roll_number: roll.clone(),
                student_name: name,
                points,
                events_attended: attended,
            })
            .collect();

        entries.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then_with(|| a.roll_number.cmp(&b.roll_number))
        });
        for (index, entry) in entries.iter_mut().enumerate() {
            entry.rank = index + 1;
        }

        Self { entries }
    }

    /// All entries in rank order.
    #[must_use]
    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    /// The first `n` entries.
    #[must_use]
    pub fn top(&self, n: usize) -> &[LeaderboardEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// Entry of a student, if they have any points.
    #[must_use]
    pub fn entry(&self, roll: &RollNumber) -> Option<&LeaderboardEntry> {
        self.entries.iter().find(|e| &e.roll_number == roll)
    }

    /// Rank of a student; `None` when they have no attendance.
    #[must_use]
    pub fn rank_of(&self, roll: &RollNumber) -> Option<usize> {
        self.entry(roll).map(|e| e.rank)
    }

    /// Points of a student; zero when absent from the board.
    #[must_use]
    pub fn points_of(&self, roll: &RollNumber) -> u32 {
        self.entry(roll).map_or(0, |e| e.points)
    }

    /// Totals, mean and extremes.
    #[must_use]
    pub fn statistics(&self) -> LeaderboardStats {
        if self.entries.is_empty() {
            return LeaderboardStats::default();
        }

        let total_points: u64 = self.entries.iter().map(|e| u64::from(e.points)).sum();
        let count = self.entries.len();

        LeaderboardStats {
            total_students: count,
            total_points,
            average_points: rounded_mean(total_points, count),
            highest_points: self.entries.iter().map(|e| e.points).max().unwrap_or(0),
            lowest_points: self.entries.iter().map(|e| e.points).min().unwrap_or(0),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
fn rounded_mean(total: u64, count: usize) -> u32 {
    (total as f64 / count as f64).round() as u32
}

// ============================================================================
// Badges
// ============================================================================

/// Badge tiers, lowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeTier {
    /// 50 points
    Bronze,
    /// 150 points
    Silver,
    /// 300 points
    Gold,
    /// 500 points
    Platinum,
    /// 1000 points
    Diamond,
}

impl BadgeTier {
    /// Every tier in ascending order.
    pub const ALL: [Self; 5] = [
        Self::Bronze,
        Self::Silver,
        Self::Gold,
        Self::Platinum,
        Self::Diamond,
    ];

    /// Points needed to earn the tier.
    #[must_use]
    pub const fn threshold(self) -> u32 {
        match self {
            Self::Bronze => 50,
            Self::Silver => 150,
            Self::Gold => 300,
            Self::Platinum => 500,
            Self::Diamond => 1000,
        }
    }

    /// Display name.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Bronze => "Bronze Explorer",
            Self::Silver => "Silver Achiever",
            Self::Gold => "Gold Champion",
            Self::Platinum => "Platinum Legend",
            Self::Diamond => "Diamond Elite",
        }
    }
}

/// A badge as shown to clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Badge {
    /// Tier
    pub tier: BadgeTier,
    /// Display name
    pub name: &'static str,
    /// Threshold
    pub required_points: u32,
}

impl From<BadgeTier> for Badge {
    fn from(tier: BadgeTier) -> Self {
        Self {
            tier,
            name: tier.title(),
            required_points: tier.threshold(),
        }
    }
}

/// Where a point total stands on the badge ladder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BadgeProgress {
    /// Point total evaluated
    pub points: u32,
    /// Every tier reached
    pub earned: Vec<Badge>,
    /// Highest tier reached
    pub current: Option<Badge>,
    /// First tier not yet reached
    pub next: Option<Badge>,
    /// Percent of the way from the current tier to the next, 100 at the top
    pub progress: u32,
    /// Points missing for the next tier
    pub points_needed: u32,
}

impl BadgeProgress {
    /// Evaluate a point total.
    #[must_use]
    pub fn for_points(points: u32) -> Self {
        let earned: Vec<Badge> = BadgeTier::ALL
            .into_iter()
            .filter(|tier| tier.threshold() <= points)
            .map(Badge::from)
            .collect();
        let current = earned.last().copied();
        let next = BadgeTier::ALL
            .into_iter()
            .find(|tier| tier.threshold() > points)
            .map(Badge::from);

        let (progress, points_needed) = next.map_or((100, 0), |next| {
            let floor = current.map_or(0, |c| c.required_points);
            let span = next.required_points - floor;
            let progress = percent((points - floor) as usize, span as usize).min(100);
            (progress, next.required_points - points)
        });

        Self {
            points,
            earned,
            current,
            next,
            progress,
            points_needed,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{
        AttendanceId, AttendanceRecord, AttendanceStatus, Event, EventCategory, EventDetails,
        EventId, School,
    };
    use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn event_with(category: EventCategory, rolls: &[&str]) -> Event {
        let details = EventDetails {
            title: format!("{category} event"),
            description: String::new(),
            category,
            school: School::parse("Amity School of Law").unwrap(),
            venue: "Hall".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
            time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            organizer: "Moot Court Society".to_string(),
            max_participants: 100,
            max_team_size: 1,
            min_team_size: 1,
            registration_deadline: now(),
        };
        let mut event = Event::new(EventId::new(), details, "fac-09".to_string(), now());
        for roll in rolls {
            event.attendance.push(AttendanceRecord {
                id: AttendanceId::new(),
                event_id: event.id,
                roll_number: roll.parse().unwrap(),
                student_name: format!("Student {roll}"),
                status: AttendanceStatus::Present,
                marked_at: now(),
                marked_by: "fac-09".to_string(),
                notes: None,
                od_granted_by: None,
                od_granted_at: None,
            });
        }
        event
    }

    fn state(events: Vec<Event>) -> PortalState {
        let mut state = PortalState::new();
        for event in events {
            state.events.insert(event.id, event);
        }
        state
    }

    #[test]
    fn ranks_by_points_then_roll() {
        let board = Leaderboard::from_state(&state(vec![
            event_with(EventCategory::Competition, &["C003"]),
            event_with(EventCategory::Workshop, &["B002", "A001"]),
            event_with(EventCategory::Sports, &["A001", "B002"]),
        ]));

        let ranked: Vec<(&str, u32, usize)> = board
            .entries()
            .iter()
            .map(|e| (e.roll_number.as_str(), e.points, e.rank))
            .collect();
        assert_eq!(
            ranked,
            vec![("C003", 25, 1), ("A001", 20, 2), ("B002", 20, 3)]
        );
        assert_eq!(board.rank_of(&"b002".parse().unwrap()), Some(3));
        assert_eq!(board.rank_of(&"Z999".parse().unwrap()), None);
        assert_eq!(board.points_of(&"Z999".parse().unwrap()), 0);
        assert_eq!(board.top(2).len(), 2);
        assert_eq!(board.top(50).len(), 3);
    }

    #[test]
    fn statistics() {
        let board = Leaderboard::from_state(&state(vec![
            event_with(EventCategory::Hackathon, &["A001"]),
            event_with(EventCategory::Webinar, &["A001", "A002"]),
        ]));

        let stats = board.statistics();
        assert_eq!(stats.total_students, 2);
        assert_eq!(stats.total_points, 34);
        assert_eq!(stats.average_points, 17);
        assert_eq!(stats.highest_points, 27);
        assert_eq!(stats.lowest_points, 7);

        assert_eq!(
            Leaderboard::default().statistics(),
            LeaderboardStats::default()
        );
    }

    #[test]
    fn badge_progress_below_first_tier() {
        let progress = BadgeProgress::for_points(25);
        assert!(progress.earned.is_empty());
        assert_eq!(progress.current, None);
        assert_eq!(progress.next.unwrap().tier, BadgeTier::Bronze);
        assert_eq!(progress.progress, 50);
        assert_eq!(progress.points_needed, 25);
    }

    #[test]
    fn badge_progress_between_tiers() {
        let progress = BadgeProgress::for_points(200);
        assert_eq!(progress.earned.len(), 2);
        assert_eq!(progress.current.unwrap().name, "Silver Achiever");
        assert_eq!(progress.next.unwrap().tier, BadgeTier::Gold);
        // (200 - 150) / (300 - 150)
        assert_eq!(progress.progress, 33);
        assert_eq!(progress.points_needed, 100);
    }

    #[test]
    fn badge_progress_at_top() {
        let progress = BadgeProgress::for_points(1000);
        assert_eq!(progress.earned.len(), 5);
        assert_eq!(progress.current.unwrap().tier, BadgeTier::Diamond);
        assert_eq!(progress.next, None);
        assert_eq!(progress.progress, 100);
        assert_eq!(progress.points_needed, 0);
    }
}
