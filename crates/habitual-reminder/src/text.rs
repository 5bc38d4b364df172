use habitual_types::{ReminderCandidate, Reward};

/// Render the reminder message for a habit. Output depends only on the
/// candidate's fields.
pub fn render(candidate: &ReminderCandidate) -> String {
    let mut text = format!(
        "Habit reminder:\nAction: {}\nPlace: {}\nTime: {}\nDuration: {} sec",
        candidate.action, candidate.place, candidate.time_of_day, candidate.duration_seconds
    );

    match &candidate.reward {
        Some(Reward::Text(reward)) => {
            text.push_str("\nReward: ");
            text.push_str(reward);
        }
        Some(Reward::PleasantHabit(action)) => {
            text.push_str("\nReward: pleasant habit: ");
            text.push_str(action);
        }
        None => {}
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use habitual_types::TimeOfDay;
    use uuid::Uuid;

    fn candidate(reward: Option<Reward>) -> ReminderCandidate {
        ReminderCandidate {
            habit_id: Uuid::nil(),
            recipient: 1,
            time_of_day: TimeOfDay::new(7, 5).unwrap(),
            periodicity_days: 1,
            last_served_at: None,
            action: "walk".into(),
            place: "park".into(),
            duration_seconds: 90,
            reward,
        }
    }

    #[test]
    fn renders_without_reward() {
        assert_eq!(
            render(&candidate(None)),
            "Habit reminder:\nAction: walk\nPlace: park\nTime: 07:05\nDuration: 90 sec"
        );
    }

    #[test]
    fn renders_explicit_reward() {
        let text = render(&candidate(Some(Reward::Text("a coffee".into()))));
        assert!(text.ends_with("\nDuration: 90 sec\nReward: a coffee"));
    }

    #[test]
    fn renders_pleasant_habit() {
        let text = render(&candidate(Some(Reward::PleasantHabit("read a book".into()))));
        assert!(text.ends_with("\nReward: pleasant habit: read a book"));
    }
}
