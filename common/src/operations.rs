//! Abstract operations and their [`Handler`]s.
//!
//! An operation is a plain value describing *what* should be done
//! ([`Select`], [`Insert`], [`Update`]), while a [`Handler`] describes *who*
//! does it. This allows the same [`Handler`] to be implemented by different
//! infrastructure backends for the same set of operations.

use std::{future::Future, marker::PhantomData};

/// Executable handler of `Args`.
pub trait Handler<Args = ()> {
    /// Type of successful [`Handler`] result.
    type Ok;

    /// Type of this [`Handler`] error.
    type Err;

    /// Executes this [`Handler`] with the provided arguments.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}

/// Operation to insert a new value.
#[derive(Clone, Copy, Debug)]
pub struct Insert<T>(pub T);

/// Operation to update an existing value.
#[derive(Clone, Copy, Debug)]
pub struct Update<T>(pub T);

/// Operation to select a value.
#[derive(Clone, Copy, Debug)]
pub struct Select<T>(pub T);

/// Selector of `W` by `B`.
#[derive(Clone, Copy, Debug)]
pub struct By<W, B> {
    /// Type of the value to select.
    _what: PhantomData<W>,

    /// Value to select by.
    by: B,
}

impl<W, B> By<W, B> {
    /// Creates a new [`By`] with the given value.
    #[must_use]
    pub fn new(by: B) -> Self {
        Self {
            _what: PhantomData,
            by,
        }
    }

    /// Returns a reference to the inner value.
    #[must_use]
    pub fn as_inner(&self) -> &B {
        &self.by
    }

    /// Consumes this [`By`] and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> B {
        self.by
    }
}

#[cfg(test)]
mod spec {
    use super::{By, Handler, Select};

    struct Doubler;

    impl Handler<Select<By<u32, u32>>> for Doubler {
        type Ok = u32;
        type Err = ();

        async fn execute(
            &self,
            Select(by): Select<By<u32, u32>>,
        ) -> Result<u32, ()> {
            Ok(by.into_inner() * 2)
        }
    }

    #[test]
    fn by_keeps_selector_value() {
        let by = By::<String, _>::new(42);

        assert_eq!(*by.as_inner(), 42);
        assert_eq!(by.into_inner(), 42);
    }

    #[tokio::test]
    async fn handler_executes_operation() {
        let out = Doubler.execute(Select(By::new(21))).await;

        assert_eq!(out, Ok(42));
    }
}
