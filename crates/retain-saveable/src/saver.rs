//! Save/restore strategies.
//!
//! A [`Saver`] is a pure pair of functions: serialize a live value into a
//! storable [`serde_json::Value`], and rebuild the value from that
//! representation later. Strategies are chosen per type: most state rides
//! on [`AutoSaver`] (anything `Serialize + DeserializeOwned`), and types
//! the store cannot hold directly get a hand-written pair via [`saver`] or
//! an adapter via [`map_saver`].

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SaverError;

pub trait Saver<T>: 'static {
    fn save(&self, value: &T) -> Result<Value, SaverError>;

    /// `None` when `saved` does not have the expected shape; callers fall
    /// back to their initializer.
    fn restore(&self, saved: &Value) -> Option<T>;
}

/// Default strategy: straight serde round trip through JSON.
pub struct AutoSaver<T>(PhantomData<fn() -> T>);

impl<T> Default for AutoSaver<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

pub fn auto_saver<T>() -> AutoSaver<T> {
    AutoSaver::default()
}

impl<T> Saver<T> for AutoSaver<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    fn save(&self, value: &T) -> Result<Value, SaverError> {
        serde_json::to_value(value).map_err(|source| SaverError::Serialize {
            type_name: std::any::type_name::<T>(),
            source,
        })
    }

    fn restore(&self, saved: &Value) -> Option<T> {
        serde_json::from_value(saved.clone()).ok()
    }
}

/// Ad-hoc strategy from a function pair.
pub struct FnSaver<S, R> {
    save: S,
    restore: R,
}

pub fn saver<T, S, R>(save: S, restore: R) -> FnSaver<S, R>
where
    S: Fn(&T) -> Value + 'static,
    R: Fn(&Value) -> Option<T> + 'static,
{
    FnSaver { save, restore }
}

impl<T, S, R> Saver<T> for FnSaver<S, R>
where
    S: Fn(&T) -> Value + 'static,
    R: Fn(&Value) -> Option<T> + 'static,
{
    fn save(&self, value: &T) -> Result<Value, SaverError> {
        Ok((self.save)(value))
    }

    fn restore(&self, saved: &Value) -> Option<T> {
        (self.restore)(saved)
    }
}

/// Adapts a saver of `U` into a saver of `T` through a projection/injection
/// pair. Injection may reject (`None`), which reads as a shape mismatch.
pub fn map_saver<T, U>(
    inner: impl Saver<U>,
    project: impl Fn(&T) -> U + 'static,
    inject: impl Fn(U) -> Option<T> + 'static,
) -> impl Saver<T>
where
    T: 'static,
    U: 'static,
{
    struct Mapped<U, Sv, P, I> {
        inner: Sv,
        project: P,
        inject: I,
        _marker: PhantomData<fn() -> U>,
    }

    impl<T, U, Sv, P, I> Saver<T> for Mapped<U, Sv, P, I>
    where
        T: 'static,
        U: 'static,
        Sv: Saver<U>,
        P: Fn(&T) -> U + 'static,
        I: Fn(U) -> Option<T> + 'static,
    {
        fn save(&self, value: &T) -> Result<Value, SaverError> {
            self.inner.save(&(self.project)(value))
        }

        fn restore(&self, saved: &Value) -> Option<T> {
            self.inner.restore(saved).and_then(&self.inject)
        }
    }

    Mapped {
        inner,
        project,
        inject,
        _marker: PhantomData,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
    struct Fill {
        color: String,
        alpha: f32,
    }

    #[test]
    fn auto_saver_round_trips() {
        let sv = auto_saver::<Fill>();
        let value = Fill {
            color: "#34AF82".into(),
            alpha: 0.5,
        };
        let saved = sv.save(&value).unwrap();
        assert_eq!(sv.restore(&saved), Some(value));
    }

    #[test]
    fn auto_saver_reports_type_on_failure() {
        // Maps with non-string keys have no JSON representation.
        let sv = auto_saver::<std::collections::HashMap<(u8, u8), String>>();
        let mut bad = std::collections::HashMap::new();
        bad.insert((1, 2), "x".to_string());

        let err = sv.save(&bad).unwrap_err();
        assert!(err.to_string().contains("HashMap"));
    }

    #[test]
    fn auto_saver_restore_rejects_wrong_shape() {
        let sv = auto_saver::<Fill>();
        assert_eq!(sv.restore(&json!([1, 2, 3])), None);
    }

    #[test]
    fn fn_saver_uses_the_given_pair() {
        let sv = saver(
            |v: &u32| json!(v.to_string()),
            |saved| saved.as_str().and_then(|s| s.parse::<u32>().ok()),
        );
        let saved = sv.save(&7).unwrap();
        assert_eq!(saved, json!("7"));
        assert_eq!(sv.restore(&saved), Some(7));
    }

    #[test]
    fn map_saver_adapts_through_projection() {
        // Store an Instant-like opaque type as its millisecond count.
        #[derive(Clone, PartialEq, Debug)]
        struct Elapsed(u64);

        let sv = map_saver(
            auto_saver::<u64>(),
            |e: &Elapsed| e.0,
            |ms| Some(Elapsed(ms)),
        );
        let saved = sv.save(&Elapsed(1500)).unwrap();
        assert_eq!(sv.restore(&saved), Some(Elapsed(1500)));
    }
}
