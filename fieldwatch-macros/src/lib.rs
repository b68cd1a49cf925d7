use proc_macro::TokenStream;

mod observable;

/// Derive macro for notifying sources.
///
/// Expects a non-generic struct with named fields: exactly one signal field
/// (of type `FieldSignal`, or marked `#[observable(signal)]`) and any number
/// of `Observed<T>` fields, with `T: Clone`. For every `Observed` field not
/// marked `#[observable(skip)]` it generates:
///
/// - `const FIELD: Field<Self, T>`, the field's selector
/// - `fn set_field(&self, value: T)`, which stores and then signals
///
/// and implements `FieldSet` and `NotifySource` for the struct.
///
/// ```rust,ignore
/// #[derive(Default, Observable)]
/// struct Settings {
///     signal: FieldSignal,
///     enabled: Observed<bool>,
///     #[observable(skip)]
///     cache: Observed<Vec<u8>>,
/// }
///
/// settings.set_enabled(true);
/// subscriptions.subscribe(&settings, Settings::ENABLED, callback)?;
/// ```
#[proc_macro_derive(Observable, attributes(observable))]
pub fn derive_observable(input: TokenStream) -> TokenStream {
    observable::derive_observable_impl(input)
}
