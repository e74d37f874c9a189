/// Define an error type `Foo` as a wrapper around a `Box<FooKind>`,
/// keeping `Result<T, Foo>` one pointer wide. `Deref` gives access to
/// the kind, `From` forwards to the kind's `From` impls so that
/// `thiserror`'s `#[from]` and `?` keep working.
#[macro_export]
macro_rules! def_boxed_error {
    ($wrappername:ident, $kindname:ident) => {

        #[derive(Debug)]
        pub struct $wrappername(Box<$kindname>);

        impl $wrappername {
            pub fn kind(&self) -> &$kindname {
                &self.0
            }
        }

        impl std::ops::Deref for $wrappername {
            type Target = $kindname;

            fn deref(&self) -> &Self::Target {
                &*self.0
            }
        }

        impl<E> From<E> for $wrappername where $kindname: From<E> {
            fn from(err: E) -> Self {
                $wrappername(Box::new($kindname::from(err)))
            }
        }

        impl std::error::Error for $wrappername {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                self.0.source()
            }
        }

        impl std::fmt::Display for $wrappername {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&*self.0, f)
            }
        }
    }
}

/// `def_boxed_thiserror!(Foo, pub enum FooKind { .. })`: defines the
/// kind with `thiserror::Error` derived, and its box wrapper as per
/// `def_boxed_error`.
#[macro_export]
macro_rules! def_boxed_thiserror {
    ($wrappername:ident, $vis:vis enum $kindname:ident {$($body:tt)*}) => {
        #[derive(thiserror::Error, Debug)]
        $vis enum $kindname {
            $($body)*
        }

        $crate::def_boxed_error!($wrappername, $kindname);
    };
}


#[cfg(test)]
mod tests {
    use std::error::Error;

    crate::def_boxed_thiserror!(ProbeError, pub enum ProbeErrorKind {
        #[error("plain failure")]
        Plain,
        #[error("io: {0}")]
        Io(#[from] std::io::Error),
    });

    fn fails() -> Result<(), ProbeError> {
        Err::<(), _>(std::io::Error::new(std::io::ErrorKind::Other, "gone"))?;
        Ok(())
    }

    #[test]
    fn t_boxed() {
        let e = fails().unwrap_err();
        assert_eq!(e.to_string(), "io: gone");
        assert!(matches!(e.kind(), ProbeErrorKind::Io(_)));
        assert!(e.source().is_some());
        let e = ProbeError::from(ProbeErrorKind::Plain);
        assert_eq!(e.to_string(), "plain failure");
        assert_eq!(std::mem::size_of::<ProbeError>(), std::mem::size_of::<usize>());
    }
}
