//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Regenerate with
//! `diesel print-schema` after changing a migration.

diesel::table! {
    /// Accounts. Deactivation flips `active`; rows are never removed.
    users (id) {
        id -> Uuid,
        name -> Varchar,
        email -> Varchar,
        role -> Varchar,
        active -> Bool,
        photo -> Text,
        password_hash -> Text,
        password_changed_at -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Tour catalogue with denormalised rating aggregate.
    tours (id) {
        id -> Uuid,
        name -> Varchar,
        slug -> Varchar,
        duration_days -> Int4,
        max_group_size -> Int4,
        difficulty -> Varchar,
        price -> Int8,
        price_discount -> Nullable<Int8>,
        summary -> Text,
        description -> Nullable<Text>,
        image_cover -> Text,
        images -> Array<Text>,
        start_dates -> Array<Timestamptz>,
        /// `{description, address?, day?, coordinates: [lng, lat]}`.
        start_location -> Nullable<Jsonb>,
        locations -> Jsonb,
        guides -> Array<Uuid>,
        ratings_average -> Float8,
        ratings_quantity -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    bookings (id) {
        id -> Uuid,
        tour_id -> Uuid,
        user_id -> Uuid,
        price -> Int8,
        paid -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    reviews (id) {
        id -> Uuid,
        tour_id -> Uuid,
        user_id -> Uuid,
        rating -> Int2,
        review -> Text,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(users, tours, bookings, reviews);
