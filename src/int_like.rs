//! Helper for defining opaque newtypes backed by an integer, without
//! compromising safety by exposing the raw representation everywhere.
//!
//! Brought over from the irq core's usual `int_like!` helper.

#[macro_export]
macro_rules! int_like {
    ($new_type_name:ident, $backing_type:ident) => {
        #[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy, Hash)]
        pub struct $new_type_name($backing_type);

        impl $new_type_name {
            #[allow(dead_code)]
            pub const fn into(self) -> $backing_type {
                self.0
            }
            #[allow(dead_code)]
            pub const fn from(x: $backing_type) -> Self {
                $new_type_name(x)
            }
            #[allow(dead_code)]
            pub const fn new(x: $backing_type) -> Self {
                Self::from(x)
            }
            #[allow(dead_code)]
            pub const fn data(&self) -> $backing_type {
                self.0
            }
        }
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn same_size_as_backing_type() {
        int_like!(UsizeLike, usize);
        assert_eq!(core::mem::size_of::<UsizeLike>(), core::mem::size_of::<usize>());
    }
}
