/// Finds the first element of an iterable matching `$variant`, extracting via `$map_fn`. Used
/// throughout `manet-core` to pull a single TLV value (e.g. `Tlv::MprWilling(w)`) out of a
/// per-address or per-message TLV list without writing the match by hand at every call site.
#[macro_export]
macro_rules! next_enum_of {
    ($iter: expr, $variant: pat => $map_fn: expr) => {
        $iter
            .iter()
            .filter_map(|x| if let $variant = x { Some($map_fn) } else { None })
            .next()
    };
}
