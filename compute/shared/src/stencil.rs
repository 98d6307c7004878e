//! Stencil identifiers

use crate::Error;
use std::{fmt, hash::Hash, str::FromStr};

/// Closed family of named stencils
pub trait Stencil:
    Copy + fmt::Debug + fmt::Display + Eq + Hash + FromStr<Err = Error> + Send + Sync + 'static
{
    /// Every stencil of the family, in reporting order
    const ALL: &'static [Self];

    /// Name used on the command line and in reports
    fn name(self) -> &'static str;
}

/// Define a stencil family as an enum with one variant per name
macro_rules! stencil_family {
    (
        $(#[$meta:meta])*
        $family:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $name:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
        pub enum $family {
            $(
                $(#[$variant_meta])*
                $variant
            ),*
        }
        //
        impl Stencil for $family {
            const ALL: &'static [Self] = &[$(Self::$variant),*];

            fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),*
                }
            }
        }
        //
        impl FromStr for $family {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Error> {
                match s {
                    $($name => Ok(Self::$variant),)*
                    _ => Err(Error::UnknownStencil(s.to_owned())),
                }
            }
        }
        //
        impl fmt::Display for $family {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

stencil_family! {
    /// Single-stage stencils reading a small neighborhood of one source field
    BasicStencil {
        /// `dst = src`
        Copy => "copy",
        /// `dst = src(i+1)`
        CopyI => "copyi",
        /// `dst = src(j+1)`
        CopyJ => "copyj",
        /// `dst = src(k+1)`
        CopyK => "copyk",
        /// `dst = src(i-1) + src(i+1)`
        AvgI => "avgi",
        /// `dst = src(j-1) + src(j+1)`
        AvgJ => "avgj",
        /// `dst = src(k-1) + src(k+1)`
        AvgK => "avgk",
        /// `dst = src + src(i+1)`
        SumI => "sumi",
        /// `dst = src + src(j+1)`
        SumJ => "sumj",
        /// `dst = src + src(k+1)`
        SumK => "sumk",
        /// `dst = src + src(i-1) + src(i+1) + src(j-1) + src(j+1)`
        LapIj => "lapij",
    }
}

stencil_family! {
    /// Multi-stage stencils of the horizontal diffusion family
    HdiffStencil {
        /// Flux-limited fourth-order horizontal diffusion
        Hdiff => "hdiff",
    }
}
