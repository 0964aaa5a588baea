use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};

use crate::models::{BlockedTime, Booking, BookingStatus, DayOfWeek, Service, WorkingHours};

const DATE_FMT: &str = "%Y-%m-%d";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

const BOOKING_COLUMNS: &str = "id, service_id, customer_id, appointment_date, start_time, end_time, status, notes, created_at, updated_at";

// ── Services ──

pub fn create_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, name, duration_minutes, price_cents, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            service.id,
            service.name,
            service.duration_minutes,
            service.price_cents,
            service.is_active,
        ],
    )?;
    Ok(())
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let result = conn.query_row(
        "SELECT id, name, duration_minutes, price_cents, is_active FROM services WHERE id = ?1",
        params![id],
        parse_service_row,
    );

    match result {
        Ok(service) => Ok(Some(service)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_active_services(conn: &Connection) -> anyhow::Result<Vec<Service>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, duration_minutes, price_cents, is_active
         FROM services WHERE is_active = 1 ORDER BY name ASC",
    )?;
    let rows = stmt.query_map([], parse_service_row)?;

    let mut services = vec![];
    for row in rows {
        services.push(row?);
    }
    Ok(services)
}

fn parse_service_row(row: &rusqlite::Row) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        name: row.get(1)?,
        duration_minutes: row.get(2)?,
        price_cents: row.get(3)?,
        is_active: row.get(4)?,
    })
}

// ── Working Hours ──

pub fn get_working_hours(conn: &Connection, day: DayOfWeek) -> anyhow::Result<Option<WorkingHours>> {
    let result = conn.query_row(
        "SELECT day_of_week, start_time, end_time, is_available FROM working_hours WHERE day_of_week = ?1",
        params![day.as_str()],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, bool>(3)?,
            ))
        },
    );

    match result {
        Ok(raw) => Ok(Some(working_hours_from_raw(raw)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_working_hours(conn: &Connection) -> anyhow::Result<Vec<WorkingHours>> {
    let mut stmt =
        conn.prepare("SELECT day_of_week, start_time, end_time, is_available FROM working_hours")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, bool>(3)?,
        ))
    })?;

    let mut hours = vec![];
    for row in rows {
        hours.push(working_hours_from_raw(row?)?);
    }
    hours.sort_by_key(|h| DayOfWeek::ALL.iter().position(|d| *d == h.day_of_week));
    Ok(hours)
}

pub fn upsert_working_hours(conn: &Connection, hours: &WorkingHours) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO working_hours (day_of_week, start_time, end_time, is_available)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(day_of_week) DO UPDATE SET
           start_time = excluded.start_time,
           end_time = excluded.end_time,
           is_available = excluded.is_available,
           updated_at = datetime('now')",
        params![
            hours.day_of_week.as_str(),
            hours.start_time,
            hours.end_time,
            hours.is_available,
        ],
    )?;
    Ok(())
}

fn working_hours_from_raw(
    (day, start_time, end_time, is_available): (String, String, String, bool),
) -> anyhow::Result<WorkingHours> {
    let day_of_week = DayOfWeek::parse(&day)
        .ok_or_else(|| anyhow::anyhow!("invalid day_of_week in working_hours: {day}"))?;
    Ok(WorkingHours {
        day_of_week,
        start_time,
        end_time,
        is_available,
    })
}

// ── Blocked Times ──

pub fn create_blocked_time(conn: &Connection, block: &BlockedTime) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO blocked_times (id, date, is_all_day, start_time, end_time, reason)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            block.id,
            block.date.format(DATE_FMT).to_string(),
            block.is_all_day,
            block.start_time,
            block.end_time,
            block.reason,
        ],
    )?;
    Ok(())
}

pub fn get_blocked_times_for_date(
    conn: &Connection,
    date: NaiveDate,
) -> anyhow::Result<Vec<BlockedTime>> {
    let mut stmt = conn.prepare(
        "SELECT id, date, is_all_day, start_time, end_time, reason
         FROM blocked_times WHERE date = ?1 ORDER BY start_time ASC",
    )?;

    let rows = stmt.query_map(params![date.format(DATE_FMT).to_string()], |row| {
        Ok(parse_blocked_row(row))
    })?;

    let mut blocks = vec![];
    for row in rows {
        blocks.push(row??);
    }
    Ok(blocks)
}

pub fn delete_blocked_time(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM blocked_times WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn parse_blocked_row(row: &rusqlite::Row) -> anyhow::Result<BlockedTime> {
    let date_str: String = row.get(1)?;
    Ok(BlockedTime {
        id: row.get(0)?,
        date: NaiveDate::parse_from_str(&date_str, DATE_FMT)?,
        is_all_day: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        reason: row.get(5)?,
    })
}

// ── Bookings ──

#[derive(Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Conflict,
}

/// Inserts a booking in one statement that only succeeds when no live
/// booking on the same date overlaps it. The partial unique index on
/// `(service_id, appointment_date, start_time)` backs this up; either
/// rejection is reported as [`InsertOutcome::Conflict`].
pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<InsertOutcome> {
    let result = conn.execute(
        "INSERT INTO bookings (id, service_id, customer_id, appointment_date, start_time, end_time, status, notes, created_at, updated_at)
         SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10
         WHERE NOT EXISTS (
             SELECT 1 FROM bookings
             WHERE appointment_date = ?4
               AND status != 'cancelled'
               AND start_time < ?6
               AND end_time > ?5
         )",
        params![
            booking.id,
            booking.service_id,
            booking.customer_id,
            booking.appointment_date.format(DATE_FMT).to_string(),
            booking.start_time,
            booking.end_time,
            booking.status.as_str(),
            booking.notes,
            booking.created_at.format(DATETIME_FMT).to_string(),
            booking.updated_at.format(DATETIME_FMT).to_string(),
        ],
    );

    match result {
        Ok(0) => Ok(InsertOutcome::Conflict),
        Ok(_) => Ok(InsertOutcome::Inserted),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Ok(InsertOutcome::Conflict)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn get_bookings_for_date(conn: &Connection, date: NaiveDate) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE appointment_date = ?1 AND status != 'cancelled' ORDER BY start_time ASC"
    ))?;

    let rows = stmt.query_map(params![date.format(DATE_FMT).to_string()], |row| {
        Ok(parse_booking_row(row))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn list_bookings(
    conn: &Connection,
    date: Option<NaiveDate>,
    status: Option<BookingStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let mut clauses: Vec<&str> = vec![];
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(date) = date {
        params_vec.push(Box::new(date.format(DATE_FMT).to_string()));
        clauses.push("appointment_date = ?");
    }
    if let Some(status) = status {
        params_vec.push(Box::new(status.as_str()));
        clauses.push("status = ?");
    }
    params_vec.push(Box::new(limit));

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let sql = format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings {where_sql}
         ORDER BY appointment_date DESC, start_time DESC LIMIT ?"
    );

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    now: NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now.format(DATETIME_FMT).to_string(), id],
    )?;
    Ok(count > 0)
}

pub fn delete_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM bookings WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let date_str: String = row.get(3)?;
    let status_str: String = row.get(6)?;
    let created_at_str: String = row.get(8)?;
    let updated_at_str: String = row.get(9)?;

    let status = BookingStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("unknown booking status: {status_str}"))?;

    Ok(Booking {
        id: row.get(0)?,
        service_id: row.get(1)?,
        customer_id: row.get(2)?,
        appointment_date: NaiveDate::parse_from_str(&date_str, DATE_FMT)?,
        start_time: row.get(4)?,
        end_time: row.get(5)?,
        status,
        notes: row.get(7)?,
        created_at: NaiveDateTime::parse_from_str(&created_at_str, DATETIME_FMT)?,
        updated_at: NaiveDateTime::parse_from_str(&updated_at_str, DATETIME_FMT)?,
    })
}

// ── Customers ──

pub fn upsert_customer_visit(
    conn: &Connection,
    customer_id: &str,
    booked_at: NaiveDateTime,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO customers (id, total_bookings, last_booking_at) VALUES (?1, 1, ?2)
         ON CONFLICT(id) DO UPDATE SET
           total_bookings = total_bookings + 1,
           last_booking_at = excluded.last_booking_at",
        params![customer_id, booked_at.format(DATETIME_FMT).to_string()],
    )?;
    Ok(())
}

pub fn get_customer_booking_count(conn: &Connection, customer_id: &str) -> anyhow::Result<i64> {
    let count: i64 = conn
        .query_row(
            "SELECT total_bookings FROM customers WHERE id = ?1",
            params![customer_id],
            |row| row.get(0),
        )
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(0),
            e => Err(e),
        })?;
    Ok(count)
}
