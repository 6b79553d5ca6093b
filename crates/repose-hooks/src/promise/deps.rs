/// Input tuple of a tracked task.
///
/// Inputs are only ever cloned and compared. `has_missing` backs the default
/// auto-trigger skip rule: a tuple with an absent (`None`) input is not ready
/// to run. Falsy-but-present values such as `0`, `false` or `""` are never
/// missing.
///
/// `same` decides whether inputs changed between passes. It is `==` except
/// for floats, where NaN is the same as NaN so a NaN input does not count as
/// a change on every pass.
pub trait Deps: Clone + PartialEq + 'static {
    fn has_missing(&self) -> bool {
        false
    }

    fn same(&self, other: &Self) -> bool {
        self == other
    }
}

impl<T: Deps> Deps for Option<T> {
    fn has_missing(&self) -> bool {
        self.is_none()
    }

    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: Deps> Deps for Vec<T> {
    fn same(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same(b))
    }
}

macro_rules! present_deps {
    ($($t:ty),* $(,)?) => {
        $(impl Deps for $t {})*
    };
}

present_deps!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    String,
    &'static str,
);

macro_rules! float_deps {
    ($($t:ty),*) => {
        $(impl Deps for $t {
            fn same(&self, other: &Self) -> bool {
                self == other || (self.is_nan() && other.is_nan())
            }
        })*
    };
}

float_deps!(f32, f64);

macro_rules! tuple_deps {
    ($($name:ident $idx:tt)+) => {
        impl<$($name: Deps),+> Deps for ($($name,)+) {
            #[allow(non_snake_case)]
            fn has_missing(&self) -> bool {
                let ($($name,)+) = self;
                false $(|| $name.has_missing())+
            }

            fn same(&self, other: &Self) -> bool {
                true $(&& self.$idx.same(&other.$idx))+
            }
        }
    };
}

tuple_deps!(A 0);
tuple_deps!(A 0 B 1);
tuple_deps!(A 0 B 1 C 2);
tuple_deps!(A 0 B 1 C 2 D 3);
tuple_deps!(A 0 B 1 C 2 D 3 E 4);
tuple_deps!(A 0 B 1 C 2 D 3 E 4 F 5);
