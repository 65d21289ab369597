//! Locale ordering: fallbacks before the locales that depend on them.

use crate::types::Locale;

/// Order locales so that every locale comes after its fallback.
///
/// Each pass scans the list once; a locale whose fallback currently sits
/// after it is moved to just behind that fallback. Passes repeat until one
/// makes no change, capped at `len + 1` passes so that self-referencing or
/// circular fallback chains still terminate (in whatever order the last pass
/// left them).
pub fn order_by_fallback(mut locales: Vec<Locale>) -> Vec<Locale> {
    let max_passes = locales.len() + 1;

    for _ in 0..max_passes {
        let mut changed = false;
        let mut i = 0;
        while i < locales.len() {
            let fallback_pos = locales[i]
                .fallback_locale
                .as_deref()
                .and_then(|code| locales.iter().position(|l| l.code == code));

            if let Some(j) = fallback_pos {
                if j > i {
                    let locale = locales.remove(i);
                    // The fallback shifted left by one when `i` was removed.
                    locales.insert(j, locale);
                    changed = true;
                }
            }
            i += 1;
        }
        if !changed {
            return locales;
        }
    }

    tracing::warn!("locale fallback ordering did not settle; fallback chain may be circular");
    locales
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(locales: &[Locale]) -> Vec<&str> {
        locales.iter().map(|l| l.code.as_str()).collect()
    }

    #[test]
    fn fallback_precedes_dependent_in_either_order() {
        let ordered = order_by_fallback(vec![
            Locale::new("en-us"),
            Locale::with_fallback("es-es", "en-us"),
        ]);
        assert_eq!(codes(&ordered), vec!["en-us", "es-es"]);

        let ordered = order_by_fallback(vec![
            Locale::with_fallback("es-es", "en-us"),
            Locale::new("en-us"),
        ]);
        assert_eq!(codes(&ordered), vec!["en-us", "es-es"]);
    }

    #[test]
    fn three_level_chain_orders_root_first() {
        let chain = || {
            vec![
                Locale::new("en-us"),
                Locale::with_fallback("es-es", "en-us"),
                Locale::with_fallback("pt-pt", "es-es"),
            ]
        };

        let mut reversed = chain();
        reversed.reverse();
        assert_eq!(
            codes(&order_by_fallback(reversed)),
            vec!["en-us", "es-es", "pt-pt"]
        );

        let shuffled = vec![
            Locale::with_fallback("es-es", "en-us"),
            Locale::with_fallback("pt-pt", "es-es"),
            Locale::new("en-us"),
        ];
        assert_eq!(
            codes(&order_by_fallback(shuffled)),
            vec!["en-us", "es-es", "pt-pt"]
        );

        assert_eq!(
            codes(&order_by_fallback(chain())),
            vec!["en-us", "es-es", "pt-pt"]
        );
    }

    #[test]
    fn unknown_fallback_is_ignored() {
        let ordered = order_by_fallback(vec![
            Locale::with_fallback("fr-fr", "xx-xx"),
            Locale::new("en-us"),
        ]);
        assert_eq!(codes(&ordered), vec!["fr-fr", "en-us"]);
    }

    #[test]
    fn circular_chain_terminates() {
        let ordered = order_by_fallback(vec![
            Locale::with_fallback("a", "b"),
            Locale::with_fallback("b", "a"),
        ]);
        assert_eq!(ordered.len(), 2);

        let self_ref = order_by_fallback(vec![Locale::with_fallback("a", "a")]);
        assert_eq!(codes(&self_ref), vec!["a"]);
    }

    #[test]
    fn empty_list() {
        assert!(order_by_fallback(Vec::new()).is_empty());
    }
}
