//! Read-only projections of the census for download.

use std::io::Cursor;

use rocket::{
    http::{ContentType, Header},
    response::{self, Responder},
    Request, Response,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    model::db::{
        census::{CensusEntry, VoterId, VotingId},
        group::CensusGroup,
    },
};

/// A row type that can be written out as CSV.
pub trait Export {
    /// Column names, in output order.
    const FIELDS: &'static [&'static str];

    /// This row's values, one per entry of [`Self::FIELDS`].
    fn csv_record(&self) -> Vec<String>;
}

/// Render rows as CSV, header first.
pub fn to_csv<T: Export>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(T::FIELDS)?;
    for row in rows {
        writer.write_record(row.csv_record())?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(bytes)
}

/// A CSV document served as a file download.
#[derive(Debug)]
pub struct CsvFile {
    pub filename: &'static str,
    pub body: Vec<u8>,
}

impl<'r> Responder<'r, 'static> for CsvFile {
    fn respond_to(self, _req: &'r Request<'_>) -> response::Result<'static> {
        Response::build()
            .header(ContentType::CSV)
            .header(Header::new(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", self.filename),
            ))
            .sized_body(self.body.len(), Cursor::new(self.body))
            .ok()
    }
}

/// Python's `repr` of a string, which is how list cells are rendered.
fn repr_str(value: &str) -> String {
    if value.contains('\'') && !value.contains('"') {
        format!("\"{}\"", value.replace('\\', "\\\\"))
    } else {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

fn repr_list<T>(items: &[T], repr: impl Fn(&T) -> String) -> String {
    let items: Vec<String> = items.iter().map(repr).collect();
    format!("[{}]", items.join(", "))
}

fn repr_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// One census entry, as exported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CensusExport {
    pub voting_id: VotingId,
    pub voter_id: VoterId,
}

impl From<CensusEntry> for CensusExport {
    fn from(entry: CensusEntry) -> Self {
        Self {
            voting_id: entry.voting_id,
            voter_id: entry.voter_id,
        }
    }
}

impl Export for CensusExport {
    const FIELDS: &'static [&'static str] = &["voting_id", "voter_id"];

    fn csv_record(&self) -> Vec<String> {
        vec![self.voting_id.to_string(), self.voter_id.to_string()]
    }
}

/// One census group, as exported. Users appear by username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupExport {
    pub name: String,
    pub users: Vec<String>,
    pub votings: Vec<VotingId>,
    pub has_voted: bool,
}

impl GroupExport {
    /// Project a group, resolving user IDs through `username`. Users that no
    /// longer exist are left out.
    pub fn new(group: CensusGroup, username: impl Fn(u32) -> Option<String>) -> Self {
        Self {
            name: group.name,
            users: group.users.into_iter().filter_map(username).collect(),
            votings: group.votings,
            has_voted: group.has_voted,
        }
    }
}

impl Export for GroupExport {
    const FIELDS: &'static [&'static str] = &["name", "users", "votings", "has_voted"];

    fn csv_record(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            repr_list(&self.users, |user| repr_str(user)),
            repr_list(&self.votings, ToString::to_string),
            repr_bool(self.has_voted).to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_string<T: Export>(rows: &[T]) -> String {
        String::from_utf8(to_csv(rows).unwrap()).unwrap()
    }

    #[test]
    fn census_csv() {
        let rows = [
            CensusExport {
                voting_id: 1,
                voter_id: 10,
            },
            CensusExport {
                voting_id: 1,
                voter_id: 11,
            },
        ];
        assert_eq!(csv_string(&rows), "voting_id,voter_id\n1,10\n1,11\n");
    }

    #[test]
    fn empty_export_has_header() {
        assert_eq!(csv_string::<CensusExport>(&[]), "voting_id,voter_id\n");
    }

    #[test]
    fn group_csv_quotes_lists() {
        let row = GroupExport {
            name: "Census_1".to_string(),
            users: vec!["user1".to_string(), "user2".to_string()],
            votings: vec![1, 2],
            has_voted: false,
        };
        assert_eq!(
            csv_string(&[row]),
            "name,users,votings,has_voted\nCensus_1,\"['user1', 'user2']\",\"[1, 2]\",False\n"
        );
    }

    #[test]
    fn python_reprs() {
        assert_eq!(repr_str("ana"), "'ana'");
        assert_eq!(repr_str("o'neil"), "\"o'neil\"");
        assert_eq!(repr_str("a\\b"), "'a\\\\b'");
        assert_eq!(repr_list::<u32>(&[], ToString::to_string), "[]");
        assert_eq!(repr_bool(true), "True");
    }

    #[test]
    fn group_export_resolves_usernames() {
        let group = CensusGroup::example(1, vec![1, 2, 3]);
        let export = GroupExport::new(group, |id| (id != 2).then(|| format!("user{id}")));
        assert_eq!(export.users, ["user1", "user3"]);
        assert_eq!(export.name, "Census_1");
    }
}
