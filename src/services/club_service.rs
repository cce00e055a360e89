use chrono::Utc;

use crate::config::{AppConfig, DeletePolicy};
use crate::database::{next_id, Database};
use crate::models::{Club, CreateClubRequest, UpdateClubRequest};
use crate::services::auth_service::Claims;
use crate::services::{auth_service, relationship, upload_service};
use crate::utils::error::{AppError, AppResult};

fn club_not_found() -> AppError {
    AppError::not_found("Club not found")
}

fn required(value: &str, field: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::bad_request(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

pub async fn list_clubs(db: &Database) -> AppResult<Vec<Club>> {
    db.load_all::<Club>().await
}

pub async fn get_club(db: &Database, id: &str) -> AppResult<Club> {
    db.find::<Club>(id).await?.ok_or_else(club_not_found)
}

/// Creates a club; the creator becomes its first member on both sides.
pub async fn create_club(db: &Database, actor: &Claims, request: CreateClubRequest) -> AppResult<Club> {
    let name = required(&request.name, "Name")?;
    let category = required(&request.category, "Category")?;
    let policy = db.id_policy();
    let creator = actor.username();

    let club = db
        .transact_all(move |snap| {
            let id = next_id(&snap.clubs, policy);
            if snap.clubs.iter().any(|c| c.id == id) {
                return Err(AppError::conflict(format!("Club id {} is already taken", id)));
            }

            let mut club = Club::new(id, name, category, creator);
            club.description = request.description.unwrap_or_default();
            club.capacity = request.capacity.unwrap_or_default();

            let user = snap.user_mut(creator).ok_or_else(auth_service::account_gone)?;
            relationship::mirror_insert(&mut user.clubs, &club.id);
            snap.clubs.push(club.clone());
            Ok(club)
        })
        .await?;

    log::info!("✅ Club created: {} ({}) by {}", club.id, club.name, creator);
    Ok(club)
}

pub async fn update_club(
    db: &Database,
    actor: &Claims,
    id: &str,
    request: UpdateClubRequest,
) -> AppResult<Club> {
    db.transact::<Club, _, _>(|clubs| {
        let club = clubs.iter_mut().find(|c| c.id == id).ok_or_else(club_not_found)?;
        actor.require_any_of(&[club.created_by.as_str()])?;

        if let Some(name) = request.name.filter(|v| !v.trim().is_empty()) {
            club.name = name;
        }
        if let Some(description) = request.description {
            club.description = description;
        }
        if let Some(category) = request.category.filter(|v| !v.trim().is_empty()) {
            club.category = category;
        }
        if let Some(capacity) = request.capacity {
            club.capacity = capacity;
        }
        club.updated_at = Some(Utc::now());
        Ok(club.clone())
    })
    .await
}

/// Deletes a club. Under [`DeletePolicy::Cascade`] its id is also removed from every user's `clubs`.
pub async fn delete_club(db: &Database, config: &AppConfig, actor: &Claims, id: &str) -> AppResult<()> {
    let policy = config.delete_policy;

    let removed = db
        .transact_all(|snap| {
            let index = snap
                .clubs
                .iter()
                .position(|c| c.id == id)
                .ok_or_else(club_not_found)?;
            actor.require_any_of(&[snap.clubs[index].created_by.as_str()])?;
            let removed = snap.clubs.remove(index);

            if policy == DeletePolicy::Cascade {
                for user in snap.users.iter_mut() {
                    relationship::mirror_remove(&mut user.clubs, id);
                }
            }
            Ok(removed)
        })
        .await?;

    if let Some(image) = removed.image.as_deref() {
        upload_service::discard_public(&config.upload_dir, image).await;
    }

    log::info!("🗑️  Club deleted: {} by {}", id, actor.username());
    Ok(())
}

/// Adds `username` to the club's members (strict) and the club to the user's clubs (mirror).
pub async fn add_member(db: &Database, actor: &Claims, id: &str, username: &str) -> AppResult<Club> {
    let username = required(username, "Username")?;
    let username = username.as_str();

    db.transact_all(|snap| {
        let club = snap.clubs.iter_mut().find(|c| c.id == id).ok_or_else(club_not_found)?;
        actor.require_any_of(&[username, club.created_by.as_str()])?;
        let user = snap
            .users
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or_else(|| AppError::not_found("User not found"))?;

        relationship::add_member(club, username)?;
        relationship::mirror_insert(&mut user.clubs, id);
        Ok(club.clone())
    })
    .await
}

/// Removes `username` from the club's members (strict) and the club from the user's clubs (mirror).
pub async fn remove_member(db: &Database, actor: &Claims, id: &str, username: &str) -> AppResult<Club> {
    let username = required(username, "Username")?;
    let username = username.as_str();

    db.transact_all(|snap| {
        let club = snap.clubs.iter_mut().find(|c| c.id == id).ok_or_else(club_not_found)?;
        actor.require_any_of(&[username, club.created_by.as_str()])?;

        relationship::remove_member(club, username)?;
        // a member whose account is gone can still be removed from the roster
        if let Some(user) = snap.users.iter_mut().find(|u| u.username == username) {
            relationship::mirror_remove(&mut user.clubs, id);
        }
        Ok(club.clone())
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
) -> AppResult<Club> {
    // authorize before touching the disk
    let existing = get_club(db, id).await?;
    actor.require_any_of(&[existing.created_by.as_str()])?;

    let stored = upload_service::store_image(
        &config.upload_dir,
        None,
        "club",
        content_type,
        bytes,
        config.max_image_bytes,
    )
    .await?;

    let public_path = stored.public_path.clone();
    let outcome = db
        .transact::<Club, _, _>(|clubs| {
            let club = clubs.iter_mut().find(|c| c.id == id).ok_or_else(club_not_found)?;
            let previous = club.image.replace(public_path.clone());
            club.updated_at = Some(Utc::now());
            Ok((club.clone(), previous))
        })
        .await;

    match outcome {
        Ok((club, previous)) => {
            if let Some(old) = previous.filter(|p| *p != stored.public_path) {
                upload_service::discard_public(&config.upload_dir, &old).await;
            }
            Ok(club)
        }
        Err(e) => {
            upload_service::discard(&stored.path).await;
            Err(e)
        }
    }
}
