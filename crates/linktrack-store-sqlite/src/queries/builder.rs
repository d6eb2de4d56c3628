//! [`Builder`]: statements assembled with `sea-query`.
//!
//! Statements are rendered with placeholders and their values bound through
//! rusqlite, so user-supplied URLs never end up inlined in SQL text.

use chrono::{DateTime, Utc};
use linktrack_core::{ChatId, LinkId, LinkInfo};
use rusqlite::{Connection, params_from_iter, types::Value as SqlValue};
use sea_query::{
  Expr, Iden, OnConflict, Order, Query, QueryStatementWriter as _, SqliteQueryBuilder, Value,
  Values,
};

use super::Queries;
use crate::{
  Error, Result,
  encode::{RawLink, encode_dt},
};

#[derive(Iden)]
enum Users {
  Table,
  UserId,
}

#[derive(Iden)]
enum Links {
  Table,
  LinkId,
  LinkUrl,
  LastUpdateCheck,
}

#[derive(Iden)]
#[iden = "userlinks"]
enum UserLinks {
  Table,
  UserId,
  LinkId,
}

// ─── Binding ─────────────────────────────────────────────────────────────────

fn bind_value(value: Value) -> Result<SqlValue> {
  let bound = match value {
    Value::Bool(v) => v.map_or(SqlValue::Null, |b| SqlValue::Integer(b.into())),
    Value::Int(v) => v.map_or(SqlValue::Null, |i| SqlValue::Integer(i.into())),
    Value::BigInt(v) => v.map_or(SqlValue::Null, SqlValue::Integer),
    Value::Unsigned(v) => v.map_or(SqlValue::Null, |i| SqlValue::Integer(i.into())),
    Value::BigUnsigned(v) => match v {
      Some(u) => SqlValue::Integer(
        i64::try_from(u).map_err(|_| Error::Unbindable(format!("{u} overflows i64")))?,
      ),
      None => SqlValue::Null,
    },
    Value::String(v) => v.map_or(SqlValue::Null, |s| SqlValue::Text(*s)),
    other => return Err(Error::Unbindable(format!("{other:?}"))),
  };
  Ok(bound)
}

fn bind(values: Values) -> Result<Vec<SqlValue>> {
  values.0.into_iter().map(bind_value).collect()
}

fn execute(conn: &Connection, (sql, values): (String, Values)) -> Result<usize> {
  Ok(conn.execute(&sql, params_from_iter(bind(values)?))?)
}

fn query<T, F>(conn: &Connection, (sql, values): (String, Values), f: F) -> Result<Vec<T>>
where
  F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
{
  let mut stmt = conn.prepare_cached(&sql)?;
  let rows = stmt
    .query_map(params_from_iter(bind(values)?), f)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn exists(conn: &Connection, statement: (String, Values)) -> Result<bool> {
  Ok(!query(conn, statement, |_| Ok(()))?.is_empty())
}

// ─── Queries impl ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct Builder;

impl Queries for Builder {
  fn insert_user(&self, conn: &Connection, id: ChatId) -> Result<()> {
    let statement = Query::insert()
      .into_table(Users::Table)
      .columns([Users::UserId])
      .values([id.0.into()])?
      .on_conflict(OnConflict::column(Users::UserId).do_nothing().to_owned())
      .build(SqliteQueryBuilder);
    execute(conn, statement)?;
    Ok(())
  }

  fn user_exists(&self, conn: &Connection, id: ChatId) -> Result<bool> {
    let statement = Query::select()
      .expr(Expr::val(1))
      .from(Users::Table)
      .and_where(Expr::col(Users::UserId).eq(id.0))
      .limit(1)
      .build(SqliteQueryBuilder);
    exists(conn, statement)
  }

  fn delete_user(&self, conn: &Connection, id: ChatId) -> Result<usize> {
    let statement = Query::delete()
      .from_table(Users::Table)
      .and_where(Expr::col(Users::UserId).eq(id.0))
      .build(SqliteQueryBuilder);
    execute(conn, statement)
  }

  fn delete_user_edges(&self, conn: &Connection, id: ChatId) -> Result<usize> {
    let statement = Query::delete()
      .from_table(UserLinks::Table)
      .and_where(Expr::col(UserLinks::UserId).eq(id.0))
      .build(SqliteQueryBuilder);
    execute(conn, statement)
  }

  fn upsert_link(&self, conn: &Connection, url: &str, now: DateTime<Utc>) -> Result<LinkId> {
    let statement = Query::insert()
      .into_table(Links::Table)
      .columns([Links::LinkUrl, Links::LastUpdateCheck])
      .values([url.into(), encode_dt(now).into()])?
      .on_conflict(OnConflict::column(Links::LinkUrl).do_nothing().to_owned())
      .build(SqliteQueryBuilder);
    execute(conn, statement)?;

    self
      .find_link(conn, url)?
      .ok_or(Error::Sqlite(rusqlite::Error::QueryReturnedNoRows))
  }

  fn find_link(&self, conn: &Connection, url: &str) -> Result<Option<LinkId>> {
    let statement = Query::select()
      .column(Links::LinkId)
      .from(Links::Table)
      .and_where(Expr::col(Links::LinkUrl).eq(url))
      .build(SqliteQueryBuilder);
    let ids = query(conn, statement, |row| row.get(0).map(LinkId))?;
    Ok(ids.into_iter().next())
  }

  fn touch_last_check(&self, conn: &Connection, url: &str, at: DateTime<Utc>) -> Result<()> {
    let at = encode_dt(at);
    let statement = Query::update()
      .table(Links::Table)
      .value(Links::LastUpdateCheck, at.clone())
      .and_where(Expr::col(Links::LinkUrl).eq(url))
      .and_where(Expr::col(Links::LastUpdateCheck).lte(at))
      .build(SqliteQueryBuilder);
    execute(conn, statement)?;
    Ok(())
  }

  fn stale_links(
    &self,
    conn: &Connection,
    after: Option<LinkId>,
    stale_before: DateTime<Utc>,
    limit: usize,
  ) -> Result<Vec<LinkInfo>> {
    let mut select = Query::select();
    select
      .columns([Links::LinkId, Links::LinkUrl, Links::LastUpdateCheck])
      .from(Links::Table)
      .and_where(Expr::col(Links::LastUpdateCheck).lt(encode_dt(stale_before)));
    if let Some(after) = after {
      select.and_where(Expr::col(Links::LinkId).gt(after.0));
    }
    let statement = select
      .order_by(Links::LinkId, Order::Asc)
      .limit(limit as u64)
      .build(SqliteQueryBuilder);

    query(conn, statement, RawLink::from_row)?
      .into_iter()
      .map(RawLink::into_info)
      .collect()
  }

  fn delete_orphan_links(&self, conn: &Connection) -> Result<usize> {
    let statement = Query::delete()
      .from_table(Links::Table)
      .and_where(
        Expr::col(Links::LinkId).not_in_subquery(
          Query::select()
            .column(UserLinks::LinkId)
            .from(UserLinks::Table)
            .to_owned(),
        ),
      )
      .build(SqliteQueryBuilder);
    execute(conn, statement)
  }

  fn insert_edge(&self, conn: &Connection, id: ChatId, link: LinkId) -> Result<bool> {
    let statement = Query::insert()
      .into_table(UserLinks::Table)
      .columns([UserLinks::UserId, UserLinks::LinkId])
      .values([id.0.into(), link.0.into()])?
      .on_conflict(
        OnConflict::columns([UserLinks::UserId, UserLinks::LinkId])
          .do_nothing()
          .to_owned(),
      )
      .build(SqliteQueryBuilder);
    Ok(execute(conn, statement)? == 1)
  }

  fn delete_edge(&self, conn: &Connection, id: ChatId, link: LinkId) -> Result<bool> {
    let statement = Query::delete()
      .from_table(UserLinks::Table)
      .and_where(Expr::col(UserLinks::UserId).eq(id.0))
      .and_where(Expr::col(UserLinks::LinkId).eq(link.0))
      .build(SqliteQueryBuilder);
    Ok(execute(conn, statement)? == 1)
  }

  fn edge_exists(&self, conn: &Connection, id: ChatId, url: &str) -> Result<bool> {
    let statement = Query::select()
      .expr(Expr::val(1))
      .from(UserLinks::Table)
      .inner_join(
        Links::Table,
        Expr::col((Links::Table, Links::LinkId)).equals((UserLinks::Table, UserLinks::LinkId)),
      )
      .and_where(Expr::col((UserLinks::Table, UserLinks::UserId)).eq(id.0))
      .and_where(Expr::col((Links::Table, Links::LinkUrl)).eq(url))
      .limit(1)
      .build(SqliteQueryBuilder);
    exists(conn, statement)
  }

  fn user_links(&self, conn: &Connection, id: ChatId) -> Result<Vec<(LinkId, String)>> {
    let statement = Query::select()
      .column((Links::Table, Links::LinkId))
      .column((Links::Table, Links::LinkUrl))
      .from(UserLinks::Table)
      .inner_join(
        Links::Table,
        Expr::col((Links::Table, Links::LinkId)).equals((UserLinks::Table, UserLinks::LinkId)),
      )
      .and_where(Expr::col((UserLinks::Table, UserLinks::UserId)).eq(id.0))
      .build(SqliteQueryBuilder);
    query(conn, statement, |row| Ok((LinkId(row.get(0)?), row.get(1)?)))
  }

  fn link_subscribers(&self, conn: &Connection, link: LinkId) -> Result<Vec<ChatId>> {
    let statement = Query::select()
      .column(UserLinks::UserId)
      .from(UserLinks::Table)
      .and_where(Expr::col(UserLinks::LinkId).eq(link.0))
      .build(SqliteQueryBuilder);
    query(conn, statement, |row| row.get(0).map(ChatId))
  }
}
