mod record;

use proc_macro::TokenStream;

// ============================================================================
// #[derive(Record)] derive macro
// ============================================================================

/// Derive macro for the `Record` trait.
///
/// # Usage
///
/// ```ignore
/// #[derive(Clone, Debug, Serialize, Deserialize, Record)]
/// #[record(patch = "TaskEdit")]
/// struct Task {
///     #[record(id)]
///     pub id: u32,
///     pub title: String,
///     pub status: TaskStatus,
/// }
///
/// let edit = TaskEdit::default().status(TaskStatus::Completed);
/// store.update(&1, edit)?;
/// ```
///
/// Generates:
/// - `impl record_store::Record` with `Id` set to the identifier field's type.
/// - A patch struct with every non-id field wrapped in `Option`, a builder-style
///   setter per field, and `impl record_store::Patch`.
///
/// Attributes:
/// - `#[record(id)]` marks the field used as the unique identifier.
///   If omitted, defaults to a field named `id`.
/// - `#[record(patch = "...")]` names the generated patch type.
///   If omitted, defaults to the struct name + "Patch".
///
/// For `Option<T>` fields the patch field is `Option<Option<T>>`: in JSON a
/// missing key leaves the field unchanged and `null` clears it.
///
/// Generic structs are not supported.
///
/// The generated patch derives `serde::Serialize` and `serde::Deserialize`, so
/// the deriving crate must depend on `serde` with the `derive` feature.
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record::derive_record(input)
}
