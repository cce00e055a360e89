use chrono::{NaiveDateTime, Utc};

use crate::config::{AppConfig, DeletePolicy};
use crate::database::{next_id, Database, Snapshot};
use crate::models::{event_time, CreateEventRequest, Event, UpdateEventRequest};
use crate::services::auth_service::Claims;
use crate::services::{auth_service, relationship, upload_service};
use crate::utils::error::{AppError, AppResult};

fn event_not_found() -> AppError {
    AppError::not_found("Event not found")
}

fn parse_time(raw: &str, field: &str) -> AppResult<NaiveDateTime> {
    if raw.trim().is_empty() {
        return Err(AppError::bad_request(format!("{} is required", field)));
    }
    event_time::parse(raw).ok_or_else(|| AppError::bad_request(format!("Invalid {}: {}", field, raw)))
}

fn check_range(start: NaiveDateTime, end: NaiveDateTime) -> AppResult<()> {
    if start >= end {
        return Err(AppError::bad_request("End date must be after start date"));
    }
    Ok(())
}

/// Empty strings mean "no club".
fn normalize_club(club: Option<String>) -> Option<String> {
    club.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
}

fn require_club(snap: &Snapshot, club: Option<&str>) -> AppResult<()> {
    match club {
        Some(id) if !snap.clubs.iter().any(|c| c.id == id) => {
            Err(AppError::not_found("Club not found"))
        }
        _ => Ok(()),
    }
}

/// Drops event ids from every user's `events` set.
fn cascade_events(snap: &mut Snapshot, ids: &[String]) {
    for user in snap.users.iter_mut() {
        for id in ids {
            relationship::mirror_remove(&mut user.events, id);
        }
    }
}

pub async fn list_events(db: &Database) -> AppResult<Vec<Event>> {
    db.load_all::<Event>().await
}

pub async fn get_event(db: &Database, id: &str) -> AppResult<Event> {
    db.find::<Event>(id).await?.ok_or_else(event_not_found)
}

pub async fn list_club_events(db: &Database, club_id: &str) -> AppResult<Vec<Event>> {
    Ok(db
        .load_all::<Event>()
        .await?
        .into_iter()
        .filter(|e| e.club.as_deref() == Some(club_id))
        .collect())
}

/// Creates an event; the creator becomes its first attendee on both sides.
pub async fn create_event(db: &Database, actor: &Claims, request: CreateEventRequest) -> AppResult<Event> {
    let title = request.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::bad_request("Title is required"));
    }
    let start_date = parse_time(&request.start_date, "startDate")?;
    let end_date = parse_time(&request.end_date, "endDate")?;
    check_range(start_date, end_date)?;

    let club = normalize_club(request.club);
    let policy = db.id_policy();
    let creator = actor.username();

    let event = db
        .transact_all(move |snap| {
            require_club(snap, club.as_deref())?;

            let id = next_id(&snap.events, policy);
            if snap.events.iter().any(|e| e.id == id) {
                return Err(AppError::conflict(format!("Event id {} is already taken", id)));
            }

            let event = Event {
                id,
                title,
                description: request.description.unwrap_or_default(),
                club,
                category: request.category.unwrap_or_default(),
                start_date: Some(start_date),
                end_date: Some(end_date),
                location: request.location.unwrap_or_default(),
                capacity: request.capacity.unwrap_or_default(),
                requires_registration: request.requires_registration,
                image: None,
                attendees: vec![creator.to_string()],
                created_by: creator.to_string(),
                created_at: Utc::now(),
                updated_at: None,
                updated_by: None,
            };

            let user = snap.user_mut(creator).ok_or_else(auth_service::account_gone)?;
            relationship::mirror_insert(&mut user.events, &event.id);
            snap.events.push(event.clone());
            Ok(event)
        })
        .await?;

    log::info!("✅ Event created: {} ({}) by {}", event.id, event.title, creator);
    Ok(event)
}

pub async fn update_event(
    db: &Database,
    actor: &Claims,
    id: &str,
    request: UpdateEventRequest,
) -> AppResult<Event> {
    let start_date = match request.start_date.as_deref() {
        Some(raw) => Some(parse_time(raw, "startDate")?),
        None => None,
    };
    let end_date = match request.end_date.as_deref() {
        Some(raw) => Some(parse_time(raw, "endDate")?),
        None => None,
    };

    let event = db
        .transact_all(move |snap| {
            let club = match request.club {
                Some(raw) => {
                    let club = normalize_club(Some(raw));
                    require_club(snap, club.as_deref())?;
                    Some(club)
                }
                None => None,
            };

            let event = snap.event_mut(id).ok_or_else(event_not_found)?;
            actor.require_any_of(&[event.created_by.as_str()])?;

            let start = start_date.or(event.start_date);
            let end = end_date.or(event.end_date);
            if let (Some(start), Some(end)) = (start, end) {
                check_range(start, end)?;
            }
            event.start_date = start;
            event.end_date = end;

            if let Some(title) = request.title.filter(|v| !v.trim().is_empty()) {
                event.title = title;
            }
            if let Some(description) = request.description {
                event.description = description;
            }
            if let Some(category) = request.category {
                event.category = category;
            }
            if let Some(location) = request.location {
                event.location = location;
            }
            if let Some(capacity) = request.capacity {
                event.capacity = capacity;
            }
            if let Some(requires) = request.requires_registration {
                event.requires_registration = requires;
            }
            if let Some(club) = club {
                event.club = club;
            }
            event.updated_at = Some(Utc::now());
            event.updated_by = Some(actor.username().to_string());
            Ok(event.clone())
        })
        .await?;

    log::info!("✏️  Event updated: {} by {}", event.id, actor.username());
    Ok(event)
}

/// Deletes an event and returns the remaining ones.
pub async fn delete_event(db: &Database, config: &AppConfig, actor: &Claims, id: &str) -> AppResult<Vec<Event>> {
    let policy = config.delete_policy;

    let (removed, remaining) = db
        .transact_all(|snap| {
            let index = snap
                .events
                .iter()
                .position(|e| e.id == id)
                .ok_or_else(event_not_found)?;
            actor.require_any_of(&[snap.events[index].created_by.as_str()])?;
            let removed = snap.events.remove(index);

            if policy == DeletePolicy::Cascade {
                cascade_events(snap, &[removed.id.clone()]);
            }
            Ok((removed, snap.events.clone()))
        })
        .await?;

    if let Some(image) = removed.image.as_deref() {
        upload_service::discard_public(&config.upload_dir, image).await;
    }

    log::info!("🗑️  Event deleted: {} by {}", id, actor.username());
    Ok(remaining)
}

/// Deletes every event of a club and returns the remaining events.
pub async fn delete_club_events(
    db: &Database,
    config: &AppConfig,
    actor: &Claims,
    club_id: &str,
) -> AppResult<Vec<Event>> {
    let policy = config.delete_policy;

    let (removed, remaining) = db
        .transact_all(|snap| {
            // the club itself may already be gone
            let owner = snap
                .clubs
                .iter()
                .find(|c| c.id == club_id)
                .map(|c| c.created_by.clone());
            match owner {
                Some(owner) => actor.require_any_of(&[owner.as_str()])?,
                None => actor.require_admin()?,
            }

            let (removed, kept): (Vec<Event>, Vec<Event>) = std::mem::take(&mut snap.events)
                .into_iter()
                .partition(|e| e.club.as_deref() == Some(club_id));
            snap.events = kept;

            if policy == DeletePolicy::Cascade {
                let ids: Vec<String> = removed.iter().map(|e| e.id.clone()).collect();
                cascade_events(snap, &ids);
            }
            Ok((removed, snap.events.clone()))
        })
        .await?;

    for image in removed.iter().filter_map(|e| e.image.as_deref()) {
        upload_service::discard_public(&config.upload_dir, image).await;
    }

    log::info!(
        "🗑️  Deleted {} event(s) of club {} by {}",
        removed.len(),
        club_id,
        actor.username()
    );
    Ok(remaining)
}

/// Idempotent registration: registering twice leaves the event unchanged and still succeeds.
pub async fn register(
    db: &Database,
    actor: &Claims,
    id: &str,
    username: Option<&str>,
) -> AppResult<Event> {
    let username = username
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| actor.username())
        .to_string();
    let username = username.as_str();

    db.transact_all(|snap| {
        let event = snap
            .events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(event_not_found)?;
        actor.require_any_of(&[username, event.created_by.as_str()])?;
        let user = snap
            .users
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or_else(|| AppError::not_found("User not found"))?;

        relationship::mirror_insert(&mut event.attendees, username);
        relationship::mirror_insert(&mut user.events, id);
        Ok(event.clone())
    })
    .await
}

/// Adds `username` to the attendees (strict) and the event to the user's events (mirror).
pub async fn add_attendee(db: &Database, actor: &Claims, id: &str, username: &str) -> AppResult<Event> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::bad_request("Username is required"));
    }

    db.transact_all(|snap| {
        let event = snap
            .events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(event_not_found)?;
        actor.require_any_of(&[username, event.created_by.as_str()])?;
        let user = snap
            .users
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or_else(|| AppError::not_found("User not found"))?;

        relationship::add_attendee(event, username)?;
        relationship::mirror_insert(&mut user.events, id);
        Ok(event.clone())
    })
    .await
}

/// Removes `username` from the attendees (strict) and the event from the user's events (mirror).
pub async fn remove_attendee(db: &Database, actor: &Claims, id: &str, username: &str) -> AppResult<Event> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::bad_request("Username is required"));
    }

    db.transact_all(|snap| {
        let event = snap
            .events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(event_not_found)?;
        actor.require_any_of(&[username, event.created_by.as_str()])?;

        relationship::remove_attendee(event, username)?;
        if let Some(user) = snap.users.iter_mut().find(|u| u.username == username) {
            relationship::mirror_remove(&mut user.events, id);
        }
        Ok(event.clone())
    })
    .await
}

pub async fn set_image(
    db: &Database,
    config: &AppConfig,
    actor: &Claims,
    id: &str,
    content_type: Option<&str>,
    bytes: &[u8],
) -> AppResult<Event> {
    let existing = get_event(db, id).await?;
    actor.require_any_of(&[existing.created_by.as_str()])?;

    let stored = upload_service::store_image(
        &config.upload_dir,
        None,
        "event",
        content_type,
        bytes,
        config.max_image_bytes,
    )
    .await?;

    let public_path = stored.public_path.clone();
    let outcome = db
        .transact::<Event, _, _>(|events| {
            let event = events.iter_mut().find(|e| e.id == id).ok_or_else(event_not_found)?;
            let previous = event.image.replace(public_path.clone());
            event.updated_at = Some(Utc::now());
            event.updated_by = Some(actor.username().to_string());
            Ok((event.clone(), previous))
        })
        .await;

    match outcome {
        Ok((event, previous)) => {
            if let Some(old) = previous.filter(|p| *p != stored.public_path) {
                upload_service::discard_public(&config.upload_dir, &old).await;
            }
            Ok(event)
        }
        Err(e) => {
            upload_service::discard(&stored.path).await;
            Err(e)
        }
    }
}
