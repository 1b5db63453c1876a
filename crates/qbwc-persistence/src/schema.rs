//! Esquema Diesel (mantenido a mano). Reemplazable con `diesel print-schema`.

diesel::table! {
    qbwc_tickets (ticket) {
        ticket -> Text,
        current_step -> Int4,
        is_authenticated -> Bool,
        state -> Text,
        version_valid -> Bool,
        pending_step -> Nullable<Text>,
        last_error -> Nullable<Text>,
        registry_hash -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    qbwc_iterators (ticket, step_name) {
        ticket -> Text,
        step_name -> Text,
        iterator_key -> Nullable<Text>,
        status -> Text,
        consumed -> Int4,
        last_progress -> Int4,
        updated_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(qbwc_tickets, qbwc_iterators,);
