//! Diesel schema for human task persistence.

diesel::table! {
    /// Human task instances with their optimistic-concurrency version.
    task_instances (id) {
        /// Task identifier.
        id -> Uuid,
        /// Display label.
        #[max_length = 255]
        task_name -> Varchar,
        /// Lifecycle status.
        #[max_length = 32]
        status -> Varchar,
        /// Status held before suspension.
        #[max_length = 32]
        previous_active_status -> Nullable<Varchar>,
        /// Actual owner.
        #[max_length = 255]
        actual_owner -> Nullable<Varchar>,
        /// Potential users as a JSON array.
        potential_users -> Jsonb,
        /// Potential groups as a JSON array.
        potential_groups -> Jsonb,
        /// Administrative users as a JSON array.
        admin_users -> Jsonb,
        /// Administrative groups as a JSON array.
        admin_groups -> Jsonb,
        /// Input map.
        inputs -> Jsonb,
        /// Output map.
        outputs -> Jsonb,
        /// Metadata map.
        metadata -> Jsonb,
        /// Process back-reference.
        process_ref -> Nullable<Jsonb>,
        /// Optimistic-concurrency version.
        version -> Int8,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Latest transition timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Pending suspension wake-up jobs.
    suspension_jobs (id) {
        /// Job identifier.
        id -> Uuid,
        /// Task to resume.
        task_id -> Uuid,
        /// Wake instant.
        wake_at -> Timestamptz,
        /// Lease expiry while a worker handles the job.
        leased_until -> Nullable<Timestamptz>,
        /// Number of claims so far.
        deliveries -> Int4,
        /// Registration timestamp.
        created_at -> Timestamptz,
    }
}
