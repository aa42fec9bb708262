diesel::table! {
    datasets (id) {
        id -> Int4,
        name -> Text,
        description -> Nullable<Text>,
        file_path -> Text,
        file_size -> Int8,
        columns_count -> Int4,
        rows_count -> Int4,
        status -> Text,
        sample_rows -> Nullable<Jsonb>,
        uploaded_at -> Timestamptz,
        processed_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    dataset_columns (id) {
        id -> Int4,
        dataset_id -> Int4,
        name -> Text,
        data_type -> Text,
        null_count -> Int4,
        unique_count -> Int4,
        sample_values -> Nullable<Array<Text>>,
        is_potential_target -> Bool,
        is_potential_treatment -> Bool,
    }
}

diesel::table! {
    analyses (id) {
        id -> Int4,
        dataset_id -> Int4,
        name -> Text,
        target_variable -> Text,
        treatment_variables -> Array<Text>,
        control_variables -> Array<Text>,
        method -> Text,
        status -> Text,
        results -> Nullable<Jsonb>,
        simple_explanation -> Nullable<Text>,
        created_at -> Timestamptz,
        completed_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(dataset_columns -> datasets (dataset_id));
diesel::joinable!(analyses -> datasets (dataset_id));

diesel::allow_tables_to_appear_in_same_query!(datasets, dataset_columns, analyses,);
