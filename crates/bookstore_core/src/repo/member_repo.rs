//! Member repository contract and SQLite implementation.

use crate::model::member::{Member, MemberDraft, MemberId, MembershipType};
use crate::repo::{contains_pattern, count_to_u64, push_window, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const MEMBER_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    membership_type,
    join_date
FROM members";

/// Filter and window options for member lists. Results are ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberQuery {
    pub name: Option<String>,
    pub membership_type: Option<MembershipType>,
    pub limit: Option<u32>,
    pub offset: u64,
}

/// Repository interface for member persistence.
pub trait MemberRepository {
    fn create_member(
        &self,
        draft: &MemberDraft,
        membership_type: MembershipType,
        join_date: i64,
    ) -> RepoResult<Member>;
    fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>>;
    fn find_member_by_email(&self, email: &str) -> RepoResult<Option<Member>>;
    fn email_exists(&self, email: &str) -> RepoResult<bool>;
    fn update_member(&self, member: &Member) -> RepoResult<()>;
    /// Removes the member row; loan history cascades.
    fn delete_member(&self, id: MemberId) -> RepoResult<()>;
    fn list_members(&self, query: &MemberQuery) -> RepoResult<Vec<Member>>;
    fn count_members(&self, query: &MemberQuery) -> RepoResult<u64>;
}

/// SQLite-backed member repository.
pub struct SqliteMemberRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMemberRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl MemberRepository for SqliteMemberRepository<'_> {
    fn create_member(
        &self,
        draft: &MemberDraft,
        membership_type: MembershipType,
        join_date: i64,
    ) -> RepoResult<Member> {
        self.conn.execute(
            "INSERT INTO members (name, email, membership_type, join_date)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                draft.name.as_str(),
                draft.email.as_str(),
                membership_type.as_str(),
                join_date,
            ],
        )?;

        Ok(Member {
            id: self.conn.last_insert_rowid(),
            name: draft.name.clone(),
            email: draft.email.clone(),
            membership_type,
            join_date,
        })
    }

    fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEMBER_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_member_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_member_by_email(&self, email: &str) -> RepoResult<Option<Member>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEMBER_SELECT_SQL} WHERE email = ?1;"))?;
        let mut rows = stmt.query([email])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_member_row(row)?)),
            None => Ok(None),
        }
    }

    fn email_exists(&self, email: &str) -> RepoResult<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM members WHERE email = ?1;", [email], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn update_member(&self, member: &Member) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE members
             SET name = ?1, email = ?2, membership_type = ?3
             WHERE id = ?4;",
            params![
                member.name.as_str(),
                member.email.as_str(),
                member.membership_type.as_str(),
                member.id,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "Member",
                id: member.id,
            });
        }
        Ok(())
    }

    fn delete_member(&self, id: MemberId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM members WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "Member",
                id,
            });
        }
        Ok(())
    }

    fn list_members(&self, query: &MemberQuery) -> RepoResult<Vec<Member>> {
        let mut sql = format!("{MEMBER_SELECT_SQL} WHERE 1 = 1");
        let mut binds = Vec::new();
        push_member_filters(query, &mut sql, &mut binds);
        sql.push_str(" ORDER BY id ASC");
        push_window(&mut sql, &mut binds, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(parse_member_row(row)?);
        }
        Ok(members)
    }

    fn count_members(&self, query: &MemberQuery) -> RepoResult<u64> {
        let mut sql = "SELECT COUNT(*) FROM members WHERE 1 = 1".to_string();
        let mut binds = Vec::new();
        push_member_filters(query, &mut sql, &mut binds);

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(binds), |row| row.get(0))?;
        Ok(count_to_u64(count))
    }
}

fn push_member_filters(query: &MemberQuery, sql: &mut String, binds: &mut Vec<Value>) {
    if let Some(name) = query
        .name
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        sql.push_str(" AND name LIKE ? ESCAPE '\\'");
        binds.push(Value::Text(contains_pattern(name)));
    }
    if let Some(membership_type) = query.membership_type {
        sql.push_str(" AND membership_type = ?");
        binds.push(Value::Text(membership_type.as_str().to_string()));
    }
}

fn parse_member_row(row: &Row<'_>) -> RepoResult<Member> {
    let tier_text: String = row.get("membership_type")?;
    let membership_type = tier_text
        .parse::<MembershipType>()
        .map_err(|err| RepoError::InvalidData(format!("{err} in members.membership_type")))?;

    Ok(Member {
        id: row.get("id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        membership_type,
        join_date: row.get("join_date")?,
    })
}
