//! Coalesces each enum's member values into the smallest set of contiguous
//! ranges, so a generated bounds check can test membership in a handful of
//! comparisons instead of one per value.

use indexmap::IndexMap;

use crate::qname::QName;
use crate::ranges::{find_ranges, Range};
use crate::types::mir;

pub fn run(types: &IndexMap<QName, mir::RootType>, type_order: &[QName]) -> IndexMap<QName, Vec<Range>> {
    let mut result = IndexMap::new();
    for name in type_order {
        if let mir::RootType::Enum(e) = &types[name] {
            let values: Vec<i64> = e.variants.values().copied().collect();
            result.insert(name.clone(), find_ranges(&values));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use protocol_schema::{Endianness, Int, Sign};

    use super::*;

    #[test]
    fn only_enums_get_ranges() {
        let struct_name = QName::from_dotted("p.S");
        let enum_name = QName::from_dotted("p.E");
        let mut types = IndexMap::new();
        types.insert(
            struct_name.clone(),
            mir::RootType::Struct(mir::Struct { name: struct_name.clone(), fields: IndexMap::new() }),
        );
        let mut variants = IndexMap::new();
        variants.insert("A".to_string(), 0i64);
        variants.insert("B".to_string(), 1i64);
        variants.insert("C".to_string(), 5i64);
        types.insert(
            enum_name.clone(),
            mir::RootType::Enum(mir::Enum {
                name: enum_name.clone(),
                underlying_type: Int { width: 1, sign: Sign::Unsigned, endianness: Endianness::Little },
                variants,
            }),
        );

        let result = run(&types, &[struct_name.clone(), enum_name.clone()]);
        assert!(!result.contains_key(&struct_name));
        assert_eq!(result[&enum_name], vec![Range { start: 0, end: 1 }, Range { start: 5, end: 5 }]);
    }
}
