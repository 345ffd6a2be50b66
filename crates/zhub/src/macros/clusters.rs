macro_rules! cluster {
    (
        $name:ident,
        $id:expr,
        $label:literal,
        attributes: [$($attribute:expr => $wire_type:ident, $field:ident, $decoder:expr);* $(;)?]
    ) => {
        #[doc = concat!("The `", $label, "` cluster.")]
        pub const $name: ClusterDescriptor = ClusterDescriptor {
            id: $id,
            name: $label,
            attributes: &[
                $(
                    AttributeDescriptor {
                        id: $attribute,
                        wire_type: WireType::$wire_type,
                        field: StateField::$field,
                        decoder: $decoder,
                    },
                )*
            ],
        };
    };
}

pub(crate) use cluster;
