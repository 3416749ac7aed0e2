pub mod auth;
pub mod dismissal;
pub mod stories;
pub mod supabase;

pub use auth::SupabaseAuthAdapter;
pub use dismissal::FileDismissalStore;
pub use stories::SupabaseStoriesAdapter;
pub use supabase::SupabaseClient;
