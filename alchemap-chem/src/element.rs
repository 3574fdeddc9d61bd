//! Element table: symbols and valence limits for H through Xe.

/// Valence data for one element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    pub atomic_number: u8,
    pub symbol: &'static str,
    /// Default valence used to fill implicit hydrogens.
    pub valence: u8,
    /// Largest explicit valence accepted for the neutral atom.
    pub max_bonds: u8,
}

const fn el(atomic_number: u8, symbol: &'static str, valence: u8, max_bonds: u8) -> Element {
    Element { atomic_number, symbol, valence, max_bonds }
}

static ELEMENTS: [Element; 54] = [
    el(1, "H", 1, 1), el(2, "He", 0, 0), el(3, "Li", 1, 1), el(4, "Be", 2, 2), el(5, "B", 3, 4), el(6, "C", 4, 4),
    el(7, "N", 3, 4), el(8, "O", 2, 3), el(9, "F", 1, 1), el(10, "Ne", 0, 0), el(11, "Na", 1, 1), el(12, "Mg", 2, 2),
    el(13, "Al", 3, 4), el(14, "Si", 4, 4), el(15, "P", 3, 6), el(16, "S", 2, 6), el(17, "Cl", 1, 1), el(18, "Ar", 0, 0),
    el(19, "K", 1, 1), el(20, "Ca", 2, 2), el(21, "Sc", 3, 6), el(22, "Ti", 4, 6), el(23, "V", 5, 6), el(24, "Cr", 3, 6),
    el(25, "Mn", 2, 6), el(26, "Fe", 3, 6), el(27, "Co", 3, 6), el(28, "Ni", 2, 6), el(29, "Cu", 2, 6), el(30, "Zn", 2, 4),
    el(31, "Ga", 3, 4), el(32, "Ge", 4, 4), el(33, "As", 3, 5), el(34, "Se", 2, 6), el(35, "Br", 1, 1), el(36, "Kr", 0, 0),
    el(37, "Rb", 1, 1), el(38, "Sr", 2, 2), el(39, "Y", 3, 6), el(40, "Zr", 4, 6), el(41, "Nb", 5, 6), el(42, "Mo", 6, 6),
    el(43, "Tc", 7, 7), el(44, "Ru", 4, 8), el(45, "Rh", 3, 6), el(46, "Pd", 2, 6), el(47, "Ag", 1, 4), el(48, "Cd", 2, 4),
    el(49, "In", 3, 4), el(50, "Sn", 4, 4), el(51, "Sb", 3, 5), el(52, "Te", 2, 6), el(53, "I", 1, 1), el(54, "Xe", 0, 0),
];

impl Element {
    /// Largest explicit valence accepted for this element at `formal_charge`.
    ///
    /// Cations of the nitrogen and oxygen groups gain a bond and their anions
    /// lose one; carbon-group ions lose one either way; boron-group anions
    /// gain one.
    pub fn allowed_valence(&self, formal_charge: i8) -> i16 {
        let charge = formal_charge as i16;
        if charge == 0 {
            return self.max_bonds as i16;
        }
        let allowed = match self.atomic_number {
            5 | 13 | 31 | 49 => self.valence as i16 - charge,
            6 | 14 | 32 | 50 => self.valence as i16 - charge.abs(),
            7 | 8 | 9 | 17 | 35 | 53 => self.valence as i16 + charge,
            15 | 16 | 33 | 34 | 51 | 52 => self.max_bonds as i16 + charge,
            _ => self.max_bonds as i16,
        };
        allowed.max(0)
    }
}

/// Look up an element by its symbol (e.g. "C", "Cl").
pub fn element_by_symbol(symbol: &str) -> Option<&'static Element> {
    ELEMENTS.iter().find(|e| e.symbol == symbol)
}

/// Look up an element by symbol ignoring case, as written by some
/// force-field tools ("CL", "BR").
pub fn element_by_symbol_ignore_case(symbol: &str) -> Option<&'static Element> {
    ELEMENTS.iter().find(|e| e.symbol.eq_ignore_ascii_case(symbol))
}

/// Look up an element by its atomic number.
pub fn element_by_number(n: u8) -> Option<&'static Element> {
    ELEMENTS.get((n as usize).checked_sub(1)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_symbol_and_number() {
        let c = element_by_symbol("C").unwrap();
        assert_eq!(c.atomic_number, 6);
        assert_eq!(c.valence, 4);
        assert_eq!(element_by_number(7).unwrap().symbol, "N");
        assert_eq!(element_by_number(54).unwrap().symbol, "Xe");
    }

    #[test]
    fn case_insensitive_lookup() {
        assert_eq!(element_by_symbol_ignore_case("CL").unwrap().atomic_number, 17);
        assert!(element_by_symbol("CL").is_none());
    }

    #[test]
    fn unknown_returns_none() {
        assert!(element_by_symbol("Zz").is_none());
        assert!(element_by_number(0).is_none());
        assert!(element_by_number(55).is_none());
    }

    #[test]
    fn charge_adjusts_allowed_valence() {
        let n = element_by_number(7).unwrap();
        assert_eq!(n.allowed_valence(1), 4);
        assert_eq!(n.allowed_valence(-1), 2);
        let o = element_by_number(8).unwrap();
        assert_eq!(o.allowed_valence(-1), 1);
        let c = element_by_number(6).unwrap();
        assert_eq!(c.allowed_valence(0), 4);
        assert_eq!(c.allowed_valence(1), 3);
        assert_eq!(element_by_number(5).unwrap().allowed_valence(-1), 4);
    }
}
