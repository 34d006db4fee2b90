use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection};

use crate::models::{
    AdminContact, Booking, BookingStatus, Notification, NotificationType, Payment, PaymentMethod,
    PaymentStatus, Turf, User,
};

const DATE_FMT: &str = "%Y-%m-%d";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

// ── Users ──

pub fn save_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, name, phone, email) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           phone = excluded.phone,
           email = excluded.email",
        params![user.id, user.name, user.phone, user.email],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, name, phone, email FROM users WHERE id = ?1",
        params![id],
        |row| {
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
                phone: row.get(2)?,
                email: row.get(3)?,
            })
        },
    );

    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// ── Turfs ──

pub fn create_turf(conn: &Connection, turf: &Turf) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO turfs (id, name, location, address, sport, price, description, owner_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            turf.id,
            turf.name,
            turf.location,
            turf.address,
            turf.sport,
            turf.price,
            turf.description,
            turf.owner_id,
        ],
    )?;
    Ok(())
}

pub fn get_turf(conn: &Connection, id: &str) -> anyhow::Result<Option<Turf>> {
    let result = conn.query_row(
        "SELECT id, name, location, address, sport, price, description, owner_id
         FROM turfs WHERE id = ?1",
        params![id],
        |row| Ok(parse_turf_row(row)),
    );

    match result {
        Ok(turf) => Ok(Some(turf?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_turfs(conn: &Connection) -> anyhow::Result<Vec<Turf>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, location, address, sport, price, description, owner_id
         FROM turfs ORDER BY name ASC",
    )?;

    let rows = stmt.query_map([], |row| Ok(parse_turf_row(row)))?;

    let mut turfs = vec![];
    for row in rows {
        turfs.push(row??);
    }
    Ok(turfs)
}

fn parse_turf_row(row: &rusqlite::Row) -> anyhow::Result<Turf> {
    Ok(Turf {
        id: row.get(0)?,
        name: row.get(1)?,
        location: row.get(2)?,
        address: row.get(3)?,
        sport: row.get(4)?,
        price: row.get(5)?,
        description: row.get(6)?,
        owner_id: row.get(7)?,
    })
}

// ── Bookings ──

/// Single atomic insert-or-fail. The partial unique index on
/// (turf_id, date, slot) WHERE status = 'confirmed' is what arbitrates
/// concurrent claims; callers inspect the rusqlite error to distinguish a
/// lost race from other failures.
pub fn insert_booking(conn: &Connection, booking: &Booking) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO bookings (id, user_id, turf_id, date, slot, status, payment_method,
                               admin_name, admin_phone, admin_email, booking_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            booking.id,
            booking.user_id,
            booking.turf_id,
            booking.date.format(DATE_FMT).to_string(),
            booking.slot,
            booking.status.as_str(),
            booking.payment_method.as_str(),
            booking.admin_contact.name,
            booking.admin_contact.phone,
            booking.admin_contact.email,
            booking.booking_date.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn is_unique_violation(e: &rusqlite::Error) -> bool {
    // Only the unique-index arbitration counts as a lost race; other
    // constraint failures (NOT NULL, CHECK) stay unknown errors.
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

pub fn get_booking(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        "SELECT id, user_id, turf_id, date, slot, status, payment_method,
                admin_name, admin_phone, admin_email, booking_date
         FROM bookings WHERE id = ?1",
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn bookings_for_user(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, turf_id, date, slot, status, payment_method,
                admin_name, admin_phone, admin_email, booking_date
         FROM bookings WHERE user_id = ?1 ORDER BY booking_date DESC",
    )?;

    let rows = stmt.query_map(params![user_id], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn booked_slots(conn: &Connection, turf_id: &str, date: NaiveDate) -> anyhow::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT slot FROM bookings
         WHERE turf_id = ?1 AND date = ?2 AND status = 'confirmed'
         ORDER BY slot ASC",
    )?;

    let rows = stmt.query_map(
        params![turf_id, date.format(DATE_FMT).to_string()],
        |row| row.get::<_, String>(0),
    )?;

    let mut slots = vec![];
    for row in rows {
        slots.push(row?);
    }
    Ok(slots)
}

/// The only legal status transition is confirmed → cancelled; a cancelled
/// booking is never resurrected, so the WHERE clause refuses anything else.
pub fn cancel_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = 'cancelled' WHERE id = ?1 AND status = 'confirmed'",
        params![id],
    )?;
    Ok(count > 0)
}

pub fn append_user_booking(conn: &Connection, user_id: &str, booking_id: &str) -> anyhow::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO user_bookings (user_id, booking_id) VALUES (?1, ?2)",
        params![user_id, booking_id],
    )?;
    Ok(())
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let turf_id: String = row.get(2)?;
    let date_str: String = row.get(3)?;
    let slot: String = row.get(4)?;
    let status_str: String = row.get(5)?;
    let method_str: String = row.get(6)?;
    let admin_name: String = row.get(7)?;
    let admin_phone: String = row.get(8)?;
    let admin_email: String = row.get(9)?;
    let booking_date_str: String = row.get(10)?;

    let date = NaiveDate::parse_from_str(&date_str, DATE_FMT)
        .unwrap_or_else(|_| Utc::now().date_naive());
    let booking_date = NaiveDateTime::parse_from_str(&booking_date_str, DATETIME_FMT)
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Booking {
        id,
        user_id,
        turf_id,
        date,
        slot,
        status: BookingStatus::parse(&status_str),
        payment_method: PaymentMethod::parse(&method_str).unwrap_or(PaymentMethod::Cash),
        admin_contact: AdminContact {
            name: admin_name,
            phone: admin_phone,
            email: admin_email,
        },
        booking_date,
    })
}

// ── Payments ──

pub fn insert_payment(conn: &Connection, payment: &Payment) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO payments (id, user_id, booking_id, turf_id, amount, payment_method,
                               status, transaction_id, date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            payment.id,
            payment.user_id,
            payment.booking_id,
            payment.turf_id,
            payment.amount,
            payment.payment_method.as_str(),
            payment.status.as_str(),
            payment.transaction_id,
            payment.date.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn payments_for_user(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Payment>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, booking_id, turf_id, amount, payment_method, status, transaction_id, date
         FROM payments WHERE user_id = ?1 ORDER BY date DESC",
    )?;

    let rows = stmt.query_map(params![user_id], |row| Ok(parse_payment_row(row)))?;

    let mut payments = vec![];
    for row in rows {
        payments.push(row??);
    }
    Ok(payments)
}

fn parse_payment_row(row: &rusqlite::Row) -> anyhow::Result<Payment> {
    let method_str: String = row.get(5)?;
    let status_str: String = row.get(6)?;
    let date_str: String = row.get(8)?;

    let date = NaiveDateTime::parse_from_str(&date_str, DATETIME_FMT)
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Payment {
        id: row.get(0)?,
        user_id: row.get(1)?,
        booking_id: row.get(2)?,
        turf_id: row.get(3)?,
        amount: row.get(4)?,
        payment_method: PaymentMethod::parse(&method_str).unwrap_or(PaymentMethod::Cash),
        status: PaymentStatus::parse(&status_str),
        transaction_id: row.get(7)?,
        date,
    })
}

// ── Notifications ──

pub fn insert_notification(
    conn: &Connection,
    user_id: &str,
    admin_id: &str,
    turf_id: &str,
    kind: NotificationType,
    message: &str,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO notifications (user_id, admin_id, turf_id, type, message)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, admin_id, turf_id, kind.as_str(), message],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn notifications_for_user(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Notification>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, admin_id, turf_id, type, message, read, created_at
         FROM notifications WHERE user_id = ?1 OR admin_id = ?1
         ORDER BY created_at DESC, id DESC",
    )?;

    let rows = stmt.query_map(params![user_id], |row| {
        let kind_str: String = row.get(4)?;
        Ok(Notification {
            id: row.get(0)?,
            user_id: row.get(1)?,
            admin_id: row.get(2)?,
            turf_id: row.get(3)?,
            kind: NotificationType::parse(&kind_str),
            message: row.get(5)?,
            read: row.get::<_, i32>(6)? != 0,
            created_at: row.get(7)?,
        })
    })?;

    let mut notifications = vec![];
    for row in rows {
        notifications.push(row?);
    }
    Ok(notifications)
}

pub fn mark_notification_read(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE notifications SET read = 1 WHERE id = ?1",
        params![id],
    )?;
    Ok(count > 0)
}
