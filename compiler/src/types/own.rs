//! Partitions `type_order` into types declared by this protocol and types
//! merely referenced from another one. Codegen needs this distinction: an
//! external type gets imported, not re-emitted.

use std::collections::HashSet;

use crate::qname::QName;

pub fn run(proto_name: &QName, type_order: &[QName]) -> (Vec<QName>, HashSet<QName>) {
    let mut own = Vec::new();
    let mut external_protocols = HashSet::new();
    for name in type_order {
        if name.namespace() == *proto_name {
            own.push(name.clone());
        } else {
            external_protocols.insert(name.namespace());
        }
    }
    (own, external_protocols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partitions_by_namespace() {
        let proto = QName::from_dotted("p");
        let order = vec![
            QName::from_dotted("p.A"),
            QName::from_dotted("p.B"),
            QName::from_dotted("q.C"),
        ];
        let (own, external) = run(&proto, &order);
        assert_eq!(own, vec![QName::from_dotted("p.A"), QName::from_dotted("p.B")]);
        assert_eq!(external, HashSet::from([QName::from_dotted("q")]));
    }
}
