//! Output formatting: session listing and JSON.

use scheduler::{Happiness, Schedule, ScheduledSession, Volunteer};
use serde::Serialize;
use std::io::{self, Write};

const SESSION_SEPARATOR_WIDTH: usize = 20;

#[derive(Serialize)]
struct JsonOutput<'a> {
    sessions: &'a [ScheduledSession],
    unseated: &'a [String],
    volunteers: &'a [Volunteer],
    #[serde(skip_serializing_if = "Option::is_none")]
    happiness: Option<Happiness>,
}

/// Writes every session with its topics and the people seated in them.
pub fn write_sessions<W: Write>(out: &mut W, schedule: &Schedule) -> io::Result<()> {
    for session in &schedule.sessions {
        writeln!(out, "Session {}:", session.number)?;
        for group in &session.groups {
            writeln!(out, "  - {}:", group.topic)?;
            for member in &group.members {
                writeln!(out, "{member}")?;
            }
        }
        writeln!(out, "{}", "-".repeat(SESSION_SEPARATOR_WIDTH))?;
    }
    Ok(())
}

/// Writes one `Name: Topic A, Topic B` line per volunteer.
pub fn write_volunteers<W: Write>(out: &mut W, volunteers: &[Volunteer]) -> io::Result<()> {
    for volunteer in volunteers {
        writeln!(out, "{}: {}", volunteer.name, volunteer.topics.join(", "))?;
    }
    Ok(())
}

/// Writes the full text report: sessions, volunteers and anyone left unseated.
pub fn write_text<W: Write>(out: &mut W, schedule: &Schedule, volunteers: &[Volunteer]) -> io::Result<()> {
    write_sessions(out, schedule)?;

    writeln!(out, "\nVolunteers:")?;
    write_volunteers(out, volunteers)?;

    if !schedule.unseated.is_empty() {
        writeln!(out, "\nUnseated:")?;
        for name in &schedule.unseated {
            writeln!(out, "{name}")?;
        }
    }
    Ok(())
}

/// Writes the schedule as one pretty JSON document.
pub fn write_json<W: Write>(
    out: &mut W,
    schedule: &Schedule,
    volunteers: &[Volunteer],
    happiness: Option<Happiness>,
) -> io::Result<()> {
    let output = JsonOutput {
        sessions: &schedule.sessions,
        unseated: &schedule.unseated,
        volunteers,
        happiness,
    };

    serde_json::to_writer_pretty(&mut *out, &output)?;
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler::AssignedGroup;

    mod common {
        use super::*;

        pub(crate) fn group(topic: &str, members: &[&str]) -> AssignedGroup {
            let mut group = AssignedGroup::new(topic);
            group.members = members.iter().map(|m| (*m).to_owned()).collect();
            group
        }

        pub(crate) fn sample_schedule() -> Schedule {
            Schedule {
                sessions: vec![
                    ScheduledSession { number: 1, groups: vec![group("AI", &["Alice", "Carol"]), group("Labs", &["Bob"])] },
                    ScheduledSession { number: 2, groups: vec![group("Outreach", &["Bob", "Alice"])] },
                ],
                unseated: vec![],
            }
        }

        pub(crate) fn volunteers() -> Vec<Volunteer> {
            vec![Volunteer { name: "Alice".into(), topics: vec!["AI".into(), "Outreach".into()] }]
        }

        pub(crate) fn render(write: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
            let mut buffer = Vec::new();
            write(&mut buffer).unwrap();
            String::from_utf8(buffer).unwrap()
        }
    }

    mod unit_tests {
        use super::{common::*, *};

        #[test]
        fn test_text_output() {
            let text = render(|out| write_text(out, &sample_schedule(), &volunteers()));

            assert_eq!(text, "\
Session 1:
  - AI:
Alice
Carol
  - Labs:
Bob
--------------------
Session 2:
  - Outreach:
Bob
Alice
--------------------

Volunteers:
Alice: AI, Outreach
");
        }

        #[test]
        fn test_text_output_lists_unseated() {
            let mut schedule = sample_schedule();
            schedule.unseated = vec!["Dan".into()];

            let text = render(|out| write_text(out, &schedule, &[]));

            assert!(text.ends_with("\nVolunteers:\n\nUnseated:\nDan\n"));
        }

        #[test]
        fn test_json_output() {
            let happiness = Happiness { seated: 3, matched: 4, unseated: 0 };
            let text = render(|out| write_json(out, &sample_schedule(), &volunteers(), Some(happiness)));
            let json: serde_json::Value = serde_json::from_str(&text).unwrap();

            assert_eq!(json["sessions"][0]["groups"][0]["topic"], "AI");
            assert_eq!(json["sessions"][1]["groups"][0]["members"][1], "Alice");
            assert_eq!(json["volunteers"][0]["topics"][1], "Outreach");
            assert_eq!(json["happiness"]["matched"], 4);
            assert!(json["unseated"].as_array().unwrap().is_empty());
        }

        #[test]
        fn test_json_output_without_happiness() {
            let text = render(|out| write_json(out, &sample_schedule(), &[], None));
            let json: serde_json::Value = serde_json::from_str(&text).unwrap();

            assert!(json.get("happiness").is_none());
        }
    }
}
